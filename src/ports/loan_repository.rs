use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 貸出の絞り込み条件
///
/// すべての条件はANDで結合される。未指定の条件は絞り込まない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
    /// 保存されたステータス
    pub status: Option<LoanStatus>,
    /// trueなら返却日が未設定のものに限る
    pub unreturned: bool,
    /// 返却期限がこの時刻より前（厳密）
    pub due_before: Option<DateTime<Utc>>,
}

impl LoanFilter {
    pub fn for_member(mut self, member_id: MemberId) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn for_book(mut self, book_id: BookId) -> Self {
        self.book_id = Some(book_id);
        self
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn unreturned(mut self) -> Self {
        self.unreturned = true;
        self
    }

    pub fn due_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.due_before = Some(cutoff);
        self
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        self.member_id.is_none_or(|id| loan.member_id == id)
            && self.book_id.is_none_or(|id| loan.book_id == id)
            && self.status.is_none_or(|status| loan.status == status)
            && (!self.unreturned || loan.returned_at.is_none())
            && self.due_before.is_none_or(|cutoff| loan.due_date < cutoff)
    }
}

/// 貸出一覧の並び順
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSort {
    /// 貸出日の新しい順
    LoanedAtDesc,
    /// 返却期限の古い順
    DueDateAsc,
}

/// 貸出の状態更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanUpdate {
    pub status: LoanStatus,
    pub returned_at: Option<DateTime<Utc>>,
}

impl LoanUpdate {
    pub fn returned(returned_at: DateTime<Utc>) -> Self {
        Self {
            status: LoanStatus::Returned,
            returned_at: Some(returned_at),
        }
    }
}

/// 貸出リポジトリポート
///
/// 貸出と書籍の貸出可否フラグをまとめて書き換える操作は、全件成功か全件失敗のどちらかとなる。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    async fn count(&self, filter: &LoanFilter) -> Result<u64>;

    async fn list(&self, filter: &LoanFilter, sort: LoanSort) -> Result<Vec<Loan>>;

    /// 貸出の作成と書籍フラグの更新を1トランザクションで行う
    ///
    /// 同じ書籍に未返却の貸出が既にある場合は`UniqueViolation`。
    /// 書籍が存在しない場合は`NotFound`。
    async fn create_loan_and_update_book(&self, loan: &Loan, book_available: bool) -> Result<()>;

    /// 未返却の貸出の更新と書籍フラグの更新を1トランザクションで行う
    ///
    /// 貸出が存在しない場合は`NotFound`、既に返却済みの場合は`Conflict`。
    async fn update_loan_and_book(
        &self,
        loan_id: LoanId,
        update: LoanUpdate,
        book_id: BookId,
        book_available: bool,
    ) -> Result<()>;

    /// 条件に合う貸出のステータスを一括更新し、更新件数を返す
    async fn update_many(&self, filter: &LoanFilter, status: LoanStatus) -> Result<u64>;
}
