use crate::application::ServiceDependencies;
use crate::domain::loan::LoanStatus;
use crate::ports::LoanFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// 図書館全体の集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_members: u64,
    pub active_members: u64,
    pub total_books: u64,
    pub available_books: u64,
    pub active_loans: u64,
    /// 未返却かつ返却期限切れ（保存ステータスではなく日付から導出）
    pub overdue_loans: u64,
    pub total_loans: u64,
}

pub async fn library_stats(deps: &ServiceDependencies, now: DateTime<Utc>) -> Result<LibraryStats> {
    let active_filter = LoanFilter::default().with_status(LoanStatus::Active);
    let overdue_filter = LoanFilter::default().unreturned().due_before(now);
    let all_loans = LoanFilter::default();

    let (
        total_members,
        active_members,
        total_books,
        available_books,
        active_loans,
        overdue_loans,
        total_loans,
    ) = futures::try_join!(
        deps.members.count(false),
        deps.members.count(true),
        deps.books.count(false),
        deps.books.count(true),
        deps.loans.count(&active_filter),
        deps.loans.count(&overdue_filter),
        deps.loans.count(&all_loans),
    )?;

    Ok(LibraryStats {
        total_members,
        active_members,
        total_books,
        available_books,
        active_loans,
        overdue_loans,
        total_loans,
    })
}
