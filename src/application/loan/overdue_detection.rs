use crate::application::ServiceDependencies;
use crate::domain::loan::{Loan, LoanStatus};
use crate::ports::{LoanFilter, LoanSort};
use chrono::{DateTime, Utc};

use super::errors::Result;

/// 延滞検出バッチ
///
/// 返却期限（due_date）を過ぎたActive状態の貸出を一括でOverdueに更新し、更新件数を返す。
///
/// - 既にOverdueの貸出は対象外のため、連続して実行すると2回目は0件になる
/// - 返却期限前のActiveな貸出には触れない
/// - 時刻では起動しない。スケジューラまたはAPIから明示的に呼び出す
#[tracing::instrument(skip(deps))]
pub async fn mark_overdue(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<u64> {
    let count = deps
        .loans
        .update_many(
            &LoanFilter::default()
                .with_status(LoanStatus::Active)
                .due_before(now),
            LoanStatus::Overdue,
        )
        .await?;

    tracing::info!(count, "Overdue sweep finished");

    Ok(count)
}

/// 延滞中の貸出一覧（返却期限の古い順）
///
/// 保存されたステータスに関係なく、未返却かつ返却期限を過ぎたものをすべて返す。
/// 延滞検出バッチが走るまでは保存値が遅れるため、日付からの導出を優先する。
pub async fn list_overdue(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<Vec<Loan>> {
    Ok(deps
        .loans
        .list(
            &LoanFilter::default().unreturned().due_before(now),
            LoanSort::DueDateAsc,
        )
        .await?)
}
