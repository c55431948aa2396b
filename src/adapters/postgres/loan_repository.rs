use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use crate::ports::{
    LoanFilter, LoanRepository as LoanRepositoryTrait, LoanSort, LoanUpdate, RepositoryError,
    Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::error::invalid_column;

const SELECT_LOANS: &str = r#"
    SELECT
        loan_id,
        member_id,
        book_id,
        loaned_at,
        due_date,
        returned_at,
        status
    FROM loans
    WHERE TRUE
"#;

/// PostgreSQLの行データをLoanに変換する
///
/// statusの文字列からの変換に失敗した場合はBackendエラーとする。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.try_get("status")?;
    let status = LoanStatus::from_str(status_str).map_err(invalid_column)?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        loaned_at: row.try_get("loaned_at")?,
        due_date: row.try_get("due_date")?,
        returned_at: row.try_get("returned_at")?,
        status,
    })
}

/// 絞り込み条件をWHERE句に追加する（直前のSQLは`WHERE TRUE`で終わっていること）
fn push_loan_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &LoanFilter) {
    if let Some(member_id) = filter.member_id {
        qb.push(" AND member_id = ").push_bind(member_id.value());
    }
    if let Some(book_id) = filter.book_id {
        qb.push(" AND book_id = ").push_bind(book_id.value());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if filter.unreturned {
        qb.push(" AND returned_at IS NULL");
    }
    if let Some(cutoff) = filter.due_before {
        qb.push(" AND due_date < ").push_bind(cutoff);
    }
}

/// LoanRepositoryのPostgreSQL実装
///
/// 書籍ごとの未返却の貸出は部分一意インデックス（loans_one_unreturned_per_book）で1件に制限され、
/// 同時に貸し出そうとした2件目は一意制約違反となる。
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn find_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_LOANS);
        qb.push(" AND loan_id = ").push_bind(loan_id.value());

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn count(&self, filter: &LoanFilter) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans WHERE TRUE");
        push_loan_filter(&mut qb, filter);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn list(&self, filter: &LoanFilter, sort: LoanSort) -> Result<Vec<Loan>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_LOANS);
        push_loan_filter(&mut qb, filter);
        qb.push(match sort {
            LoanSort::LoanedAtDesc => " ORDER BY loaned_at DESC",
            LoanSort::DueDateAsc => " ORDER BY due_date ASC",
        });

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_loan).collect()
    }

    async fn create_loan_and_update_book(&self, loan: &Loan, book_available: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                member_id,
                book_id,
                loaned_at,
                due_date,
                returned_at,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.member_id.value())
        .bind(loan.book_id.value())
        .bind(loan.loaned_at)
        .bind(loan.due_date)
        .bind(loan.returned_at)
        .bind(loan.status.as_str())
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query("UPDATE books SET available = $2 WHERE book_id = $1")
            .bind(loan.book_id.value())
            .bind(book_available)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // txはdropでロールバックされる
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_loan_and_book(
        &self,
        loan_id: LoanId,
        update: LoanUpdate,
        book_id: BookId,
        book_available: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // 返却済みの貸出は不変。returned_at IS NULLを更新条件に含めて二重返却を防ぐ
        let updated = sqlx::query(
            r#"
            UPDATE loans
            SET status = $2,
                returned_at = $3
            WHERE loan_id = $1 AND returned_at IS NULL
            "#,
        )
        .bind(loan_id.value())
        .bind(update.status.as_str())
        .bind(update.returned_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM loans WHERE loan_id = $1)")
                    .bind(loan_id.value())
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                RepositoryError::Conflict
            } else {
                RepositoryError::NotFound
            });
        }

        let book_updated = sqlx::query("UPDATE books SET available = $2 WHERE book_id = $1")
            .bind(book_id.value())
            .bind(book_available)
            .execute(&mut *tx)
            .await?;

        if book_updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_many(&self, filter: &LoanFilter, status: LoanStatus) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE loans SET status = ");
        qb.push_bind(status.as_str()).push(" WHERE TRUE");
        push_loan_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
