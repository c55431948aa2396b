use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{catalog::books::BookWithLoanCount, loan::LoanDetails};
use crate::domain::{
    book::Book,
    commands::BorrowBook,
    loan::{Eligibility, Loan, LoanStatus},
    member::Member,
    reservation::{Reservation, ReservationStatus},
    value_objects::{BookId, MemberId},
};

// ============================================================================
// Loans
// ============================================================================

/// 貸出リクエスト（POST /loans）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub member_id: Uuid,
    pub book_id: Uuid,
}

impl BorrowRequest {
    pub fn to_command(&self, borrowed_at: DateTime<Utc>) -> BorrowBook {
        BorrowBook {
            member_id: MemberId::from_uuid(self.member_id),
            book_id: BookId::from_uuid(self.book_id),
            borrowed_at,
        }
    }
}

/// 貸出一覧取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    /// ステータスでフィルタリング（active, overdue, returned）
    pub status: Option<String>,
    /// 会員IDでフィルタリング
    pub member_id: Option<Uuid>,
}

/// 貸出レスポンス
///
/// `status`は返却期限から導出した現在のステータス。
/// 一覧・詳細では会員と書籍を埋め込む。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub member_id: Uuid,
    pub book_id: Uuid,
    pub loaned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookResponse>,
}

impl LoanResponse {
    pub fn from_loan(loan: &Loan, now: DateTime<Utc>) -> Self {
        Self {
            loan_id: loan.loan_id.value(),
            member_id: loan.member_id.value(),
            book_id: loan.book_id.value(),
            loaned_at: loan.loaned_at,
            due_date: loan.due_date,
            returned_at: loan.returned_at,
            status: loan.effective_status(now).as_str().to_string(),
            member: None,
            book: None,
        }
    }

    pub fn from_details(details: LoanDetails, now: DateTime<Utc>) -> Self {
        Self {
            member: details.member.map(MemberResponse::from),
            book: details.book.map(BookResponse::from),
            ..Self::from_loan(&details.loan, now)
        }
    }
}

/// 延滞スイープの結果（POST /loans/overdue/sweep）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub count: u64,
}

/// 貸出可否（GET /members/:id/eligibility）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub member_id: Uuid,
    pub can_borrow: bool,
    /// 貸出できない理由
    pub reason: Option<String>,
}

impl EligibilityResponse {
    pub fn new(member_id: MemberId, eligibility: Eligibility) -> Self {
        let reason = match eligibility {
            Eligibility::Eligible => None,
            Eligibility::UnknownMember => Some("unknown_member".to_string()),
            Eligibility::InactiveMember => Some("inactive_member".to_string()),
            Eligibility::LoanLimitReached { limit } => {
                Some(format!("loan_limit_reached ({limit})"))
            }
            Eligibility::HasOverdueLoan => Some("overdue_loan".to_string()),
        };
        Self {
            member_id: member_id.value(),
            can_borrow: eligibility.is_eligible(),
            reason,
        }
    }
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub member_id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id.value(),
            last_name: member.last_name,
            first_name: member.first_name,
            email: member.email,
            phone: member.phone,
            active: member.active,
            registered_at: member.registered_at,
        }
    }
}

// ============================================================================
// Books
// ============================================================================

/// 書籍一覧取得のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub available: Option<bool>,
    pub category: Option<String>,
    pub author: Option<String>,
}

/// 書籍検索のクエリパラメータ（GET /books/search?q=）
#[derive(Debug, Default, Deserialize)]
pub struct SearchBooksQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub book_id: Uuid,
    pub title: String,
    pub isbn: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub available: bool,
    /// 貸出回数（一覧・検索・詳細のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loans_count: Option<u64>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.book_id.value(),
            title: book.title,
            isbn: book.isbn,
            author: book.author,
            publisher: book.publisher,
            publication_year: book.publication_year,
            category: book.category,
            available: book.available,
            loans_count: None,
        }
    }
}

impl From<BookWithLoanCount> for BookResponse {
    fn from(counted: BookWithLoanCount) -> Self {
        Self {
            loans_count: Some(counted.loans_count),
            ..Self::from(counted.book)
        }
    }
}

// ============================================================================
// Reservations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub member_id: Uuid,
    pub book_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReservationsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub reservation_id: Uuid,
    pub member_id: Uuid,
    pub book_id: Uuid,
    pub status: String,
    pub reserved_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            reservation_id: reservation.reservation_id.value(),
            member_id: reservation.member_id.value(),
            book_id: reservation.book_id.value(),
            status: reservation.status.as_str().to_string(),
            reserved_at: reservation.reserved_at,
        }
    }
}

// ============================================================================
// Misc
// ============================================================================

/// GET / のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// エラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error_type.into(),
            message: message.into(),
        }
    }
}

/// 貸出ステータスのクエリパラメータのパース
pub fn parse_loan_status(status: &str) -> Result<LoanStatus, String> {
    status.parse::<LoanStatus>()
}

/// 予約ステータスのクエリパラメータのパース
pub fn parse_reservation_status(status: &str) -> Result<ReservationStatus, String> {
    status.parse::<ReservationStatus>()
}
