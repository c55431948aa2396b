use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{BookId, LoanId, MemberId, ReturnLoanError, member::Member};

/// 貸出期間（日数）の既定値
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// 会員1人あたりの最大貸出冊数の既定値
pub const DEFAULT_MAX_ACTIVE_LOANS: u32 = 5;

/// 貸出ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 延滞中
    Overdue,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }

    pub fn is_returned(&self) -> bool {
        matches!(self, LoanStatus::Returned)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出ルール
///
/// 冊数上限・貸出期間・延滞時の貸出停止は運用で変わりうるため、定数ではなく設定値として扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    pub loan_period_days: i64,
    pub max_active_loans: u32,
    pub overdue_blocks_borrowing: bool,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            max_active_loans: DEFAULT_MAX_ACTIVE_LOANS,
            overdue_blocks_borrowing: true,
        }
    }
}

impl LoanPolicy {
    /// 貸出日から返却期限を計算する
    pub fn due_date(&self, loaned_at: DateTime<Utc>) -> DateTime<Utc> {
        due_date(loaned_at, self.loan_period_days)
    }
}

/// 貸出 - 1冊の書籍の1回の貸出
///
/// 不変条件：`returned_at`が設定されている ⇔ `status`がReturned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub loaned_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    /// 保存されたステータスではなく、日付から導出したステータス
    ///
    /// 延滞バッチが走るまで保存値は遅れるため、表示や絞り込みではこちらを使う。
    pub fn effective_status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.returned_at.is_some() {
            LoanStatus::Returned
        } else if self.due_date < now {
            LoanStatus::Overdue
        } else {
            self.status
        }
    }
}

/// 純粋関数：返却期限 = 貸出日 + 貸出期間（暦日）
///
/// 表現可能な範囲を超える期間は最大日時に丸める。
pub fn due_date(loaned_at: DateTime<Utc>, loan_period_days: i64) -> DateTime<Utc> {
    Duration::try_days(loan_period_days)
        .and_then(|period| loaned_at.checked_add_signed(period))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 純粋関数：新しい貸出を作る
///
/// 状態はActive、返却日は未設定。副作用なし。
pub fn open_loan(
    member_id: MemberId,
    book_id: BookId,
    loaned_at: DateTime<Utc>,
    policy: &LoanPolicy,
) -> Loan {
    Loan {
        loan_id: LoanId::new(),
        member_id,
        book_id,
        loaned_at,
        due_date: policy.due_date(loaned_at),
        returned_at: None,
        status: LoanStatus::Active,
    }
}

/// 純粋関数：書籍を返却する
///
/// 延滞中の貸出も返却できる。返却済みの貸出は変更不可。
pub fn return_loan(loan: &Loan, returned_at: DateTime<Utc>) -> Result<Loan, ReturnLoanError> {
    if loan.returned_at.is_some() || loan.status.is_returned() {
        return Err(ReturnLoanError::AlreadyReturned);
    }

    Ok(Loan {
        returned_at: Some(returned_at),
        status: LoanStatus::Returned,
        ..loan.clone()
    })
}

/// 純粋関数：延滞判定（未返却かつ返却期限が現在より前）
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.returned_at.is_none() && loan.due_date < now
}

/// 貸出可否の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    UnknownMember,
    InactiveMember,
    LoanLimitReached { limit: u32 },
    HasOverdueLoan,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// 純粋関数：貸出可否を判定する
///
/// 件数は呼び出し側が判定直前に読み直したものを渡すこと。
pub fn evaluate_eligibility(
    member: Option<&Member>,
    active_loans: u64,
    overdue_loans: u64,
    policy: &LoanPolicy,
) -> Eligibility {
    let Some(member) = member else {
        return Eligibility::UnknownMember;
    };
    if !member.active {
        return Eligibility::InactiveMember;
    }
    if active_loans >= u64::from(policy.max_active_loans) {
        return Eligibility::LoanLimitReached {
            limit: policy.max_active_loans,
        };
    }
    if policy.overdue_blocks_borrowing && overdue_loans > 0 {
        return Eligibility::HasOverdueLoan;
    }
    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(active: bool) -> Member {
        Member {
            member_id: MemberId::new(),
            last_name: "Dupont".to_string(),
            first_name: "Marie".to_string(),
            email: "marie.dupont@example.com".to_string(),
            phone: None,
            active,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_loan_due_date_is_fourteen_days_later() {
        let loaned_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();

        let loan = open_loan(MemberId::new(), BookId::new(), loaned_at, &LoanPolicy::default());

        assert_eq!(loan.due_date, Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap());
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.returned_at, None);
        assert_eq!(loan.loaned_at, loaned_at);
    }

    #[test]
    fn test_due_date_crosses_month_and_leap_day() {
        let loaned_at = Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap();
        assert_eq!(
            due_date(loaned_at, 14),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_due_date_uses_policy_period() {
        let policy = LoanPolicy {
            loan_period_days: 21,
            ..LoanPolicy::default()
        };
        let loaned_at = Utc::now();
        assert_eq!(policy.due_date(loaned_at), loaned_at + Duration::days(21));
    }

    #[test]
    fn test_due_date_saturates_on_huge_period() {
        let loaned_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(
            due_date(loaned_at, 200_000_000_000_000),
            DateTime::<Utc>::MAX_UTC
        );
        assert_eq!(due_date(loaned_at, i64::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_return_loan_sets_returned_at_and_status() {
        let loaned_at = Utc::now();
        let loan = open_loan(MemberId::new(), BookId::new(), loaned_at, &LoanPolicy::default());
        let returned_at = loaned_at + Duration::days(3);

        let returned = return_loan(&loan, returned_at).unwrap();

        assert_eq!(returned.returned_at, Some(returned_at));
        assert_eq!(returned.status, LoanStatus::Returned);
        assert_eq!(returned.loan_id, loan.loan_id);
        assert_eq!(returned.due_date, loan.due_date);
    }

    #[test]
    fn test_return_loan_accepts_overdue_loan() {
        let loaned_at = Utc::now() - Duration::days(30);
        let mut loan = open_loan(MemberId::new(), BookId::new(), loaned_at, &LoanPolicy::default());
        loan.status = LoanStatus::Overdue;

        let returned = return_loan(&loan, Utc::now()).unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
    }

    #[test]
    fn test_return_loan_fails_when_already_returned() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        let returned = return_loan(&loan, Utc::now()).unwrap();

        let result = return_loan(&returned, Utc::now());
        assert_eq!(result.unwrap_err(), ReturnLoanError::AlreadyReturned);
    }

    #[test]
    fn test_is_overdue_false_before_due_date() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        assert!(!is_overdue(&loan, loan.due_date - Duration::seconds(1)));
    }

    #[test]
    fn test_is_overdue_false_exactly_at_due_date() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        assert!(!is_overdue(&loan, loan.due_date));
    }

    #[test]
    fn test_is_overdue_true_after_due_date() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        assert!(is_overdue(&loan, loan.due_date + Duration::seconds(1)));
    }

    #[test]
    fn test_is_overdue_false_when_returned() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        let returned = return_loan(&loan, loan.due_date + Duration::days(2)).unwrap();
        assert!(!is_overdue(&returned, loan.due_date + Duration::days(10)));
    }

    #[test]
    fn test_effective_status_derives_overdue_from_dates() {
        let loan = open_loan(MemberId::new(), BookId::new(), Utc::now(), &LoanPolicy::default());
        assert_eq!(loan.effective_status(loan.loaned_at), LoanStatus::Active);
        assert_eq!(
            loan.effective_status(loan.due_date + Duration::days(1)),
            LoanStatus::Overdue
        );
    }

    #[test]
    fn test_loan_status_parse() {
        assert_eq!("active".parse::<LoanStatus>().unwrap(), LoanStatus::Active);
        assert_eq!("OVERDUE".parse::<LoanStatus>().unwrap(), LoanStatus::Overdue);
        assert_eq!("returned".parse::<LoanStatus>().unwrap(), LoanStatus::Returned);
        assert!("lost".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_eligibility_unknown_member() {
        let result = evaluate_eligibility(None, 0, 0, &LoanPolicy::default());
        assert_eq!(result, Eligibility::UnknownMember);
    }

    #[test]
    fn test_eligibility_inactive_member() {
        let m = member(false);
        let result = evaluate_eligibility(Some(&m), 0, 0, &LoanPolicy::default());
        assert_eq!(result, Eligibility::InactiveMember);
        assert!(!result.is_eligible());
    }

    #[test]
    fn test_eligibility_loan_limit() {
        let m = member(true);
        assert!(evaluate_eligibility(Some(&m), 4, 0, &LoanPolicy::default()).is_eligible());
        assert_eq!(
            evaluate_eligibility(Some(&m), 5, 0, &LoanPolicy::default()),
            Eligibility::LoanLimitReached { limit: 5 }
        );
    }

    #[test]
    fn test_eligibility_overdue_blocks() {
        let m = member(true);
        assert_eq!(
            evaluate_eligibility(Some(&m), 1, 1, &LoanPolicy::default()),
            Eligibility::HasOverdueLoan
        );
    }

    #[test]
    fn test_eligibility_overdue_ignored_when_policy_disables_block() {
        let m = member(true);
        let policy = LoanPolicy {
            overdue_blocks_borrowing: false,
            ..LoanPolicy::default()
        };
        assert!(evaluate_eligibility(Some(&m), 1, 3, &policy).is_eligible());
    }
}
