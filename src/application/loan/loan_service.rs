use crate::application::ServiceDependencies;
use crate::domain::{
    self,
    commands::{BorrowBook, ReturnBook},
    loan::{Eligibility, Loan, LoanStatus},
    value_objects::{LoanId, MemberId},
};
use crate::ports::{LoanFilter, LoanSort, LoanUpdate, RepositoryError};
use chrono::{DateTime, Utc};

use super::errors::{LoanApplicationError, Result};

/// 会員の貸出可否を判定する
///
/// ビジネスルール：
/// - 会員が存在し、有効であること
/// - 貸出中（Active）の冊数が上限未満であること
/// - 返却期限を過ぎた未返却の貸出がないこと
///
/// 直後の書き込みの前提となるため、呼び出しごとに件数を読み直す（キャッシュしない）。
pub async fn eligibility(
    deps: &ServiceDependencies,
    member_id: MemberId,
    now: DateTime<Utc>,
) -> Result<Eligibility> {
    let member = deps.members.find_by_id(member_id).await?;

    let (active_loans, overdue_loans) = match &member {
        Some(m) if m.active => {
            let active = deps
                .loans
                .count(
                    &LoanFilter::default()
                        .for_member(member_id)
                        .with_status(LoanStatus::Active),
                )
                .await?;
            let overdue = deps
                .loans
                .count(
                    &LoanFilter::default()
                        .for_member(member_id)
                        .unreturned()
                        .due_before(now),
                )
                .await?;
            (active, overdue)
        }
        _ => (0, 0),
    };

    Ok(domain::loan::evaluate_eligibility(
        member.as_ref(),
        active_loans,
        overdue_loans,
        &deps.loan_policy,
    ))
}

/// 会員が現在貸出を受けられるか
pub async fn can_borrow(
    deps: &ServiceDependencies,
    member_id: MemberId,
    now: DateTime<Utc>,
) -> Result<bool> {
    Ok(eligibility(deps, member_id, now).await?.is_eligible())
}

/// 書籍を貸し出す
///
/// 1. 会員の存在と有効性を確認
/// 2. 書籍の存在を確認
/// 3. 書籍に未返却の貸出がないことを貸出記録から確認（貸出可否フラグは信用しない）
/// 4. 会員の貸出可否を判定
/// 5. 貸出の作成と書籍フラグの更新を1トランザクションで実行
///
/// 手順3と5の間に他の貸出が割り込んだ場合は、ストアの一意制約により`Conflict`となる。
#[tracing::instrument(skip(deps), fields(member_id = %cmd.member_id, book_id = %cmd.book_id))]
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<Loan> {
    // 1. 会員
    let member = deps
        .members
        .find_by_id(cmd.member_id)
        .await?
        .ok_or(LoanApplicationError::MemberNotFound)?;
    if !member.active {
        tracing::debug!("Borrow refused: member is inactive");
        return Err(LoanApplicationError::InactiveMember);
    }

    // 2. 書籍
    deps.books
        .find_by_id(cmd.book_id)
        .await?
        .ok_or(LoanApplicationError::BookNotFound)?;

    // 3. 書籍の貸出状況
    let outstanding = deps
        .loans
        .count(&LoanFilter::default().for_book(cmd.book_id).unreturned())
        .await?;
    if outstanding > 0 {
        tracing::debug!("Borrow refused: book is on loan");
        return Err(LoanApplicationError::BookUnavailable);
    }

    // 4. 貸出可否
    match eligibility(deps, cmd.member_id, cmd.borrowed_at).await? {
        Eligibility::Eligible => {}
        Eligibility::UnknownMember => return Err(LoanApplicationError::MemberNotFound),
        Eligibility::InactiveMember => return Err(LoanApplicationError::InactiveMember),
        Eligibility::LoanLimitReached { limit } => {
            tracing::debug!(limit, "Borrow refused: loan limit reached");
            return Err(LoanApplicationError::LoanLimitReached { limit });
        }
        Eligibility::HasOverdueLoan => {
            tracing::debug!("Borrow refused: member has an overdue loan");
            return Err(LoanApplicationError::MemberHasOverdueLoan);
        }
    }

    // 5. 貸出作成 + 書籍フラグ更新（原子的）
    let loan = domain::loan::open_loan(
        cmd.member_id,
        cmd.book_id,
        cmd.borrowed_at,
        &deps.loan_policy,
    );

    deps.loans
        .create_loan_and_update_book(&loan, false)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => LoanApplicationError::BookNotFound,
            RepositoryError::ForeignKeyViolation(_) => LoanApplicationError::Conflict,
            other => LoanApplicationError::from(other),
        })?;

    tracing::info!(loan_id = %loan.loan_id, due_date = %loan.due_date, "Book loaned");

    Ok(loan)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 既に返却済みでないこと
/// - 延滞中の貸出も返却可能
///
/// 貸出の更新と書籍フラグの更新は1トランザクションで実行する。
#[tracing::instrument(skip(deps), fields(loan_id = %cmd.loan_id))]
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<Loan> {
    let loan = deps
        .loans
        .find_by_id(cmd.loan_id)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound)?;

    let returned = domain::loan::return_loan(&loan, cmd.returned_at)
        .map_err(|_| LoanApplicationError::AlreadyReturned)?;

    deps.loans
        .update_loan_and_book(
            returned.loan_id,
            LoanUpdate::returned(cmd.returned_at),
            returned.book_id,
            true,
        )
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => LoanApplicationError::LoanNotFound,
            other => LoanApplicationError::from(other),
        })?;

    tracing::info!(book_id = %returned.book_id, "Book returned");

    Ok(returned)
}

/// IDで貸出を取得
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loans
        .find_by_id(loan_id)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 貸出一覧（貸出日の新しい順）
///
/// ステータスの絞り込みは導出ステータスで行う。
/// 保存値がActiveでも返却期限を過ぎていればOverdueとして扱う。
pub async fn list_loans(
    deps: &ServiceDependencies,
    status: Option<LoanStatus>,
    member_id: Option<MemberId>,
    now: DateTime<Utc>,
) -> Result<Vec<Loan>> {
    let mut filter = LoanFilter {
        member_id,
        ..LoanFilter::default()
    };
    filter = match status {
        Some(LoanStatus::Overdue) => filter.unreturned().due_before(now),
        Some(LoanStatus::Active) => filter.unreturned(),
        Some(LoanStatus::Returned) => filter.with_status(LoanStatus::Returned),
        None => filter,
    };

    let loans = deps.loans.list(&filter, LoanSort::LoanedAtDesc).await?;

    Ok(match status {
        Some(wanted) => loans
            .into_iter()
            .filter(|loan| loan.effective_status(now) == wanted)
            .collect(),
        None => loans,
    })
}

/// 会員の全貸出（貸出履歴）
pub async fn list_member_loans(
    deps: &ServiceDependencies,
    member_id: MemberId,
) -> Result<Vec<Loan>> {
    deps.members
        .find_by_id(member_id)
        .await?
        .ok_or(LoanApplicationError::MemberNotFound)?;

    Ok(deps
        .loans
        .list(
            &LoanFilter::default().for_member(member_id),
            LoanSort::LoanedAtDesc,
        )
        .await?)
}
