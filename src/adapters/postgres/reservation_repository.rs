use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::value_objects::{BookId, MemberId, ReservationId};
use crate::ports::{
    RepositoryError, ReservationRepository as ReservationRepositoryTrait, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::error::invalid_column;

const SELECT_RESERVATIONS: &str = r#"
    SELECT
        reservation_id,
        member_id,
        book_id,
        status,
        reserved_at
    FROM reservations
    WHERE TRUE
"#;

fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    let status_str: &str = row.try_get("status")?;
    let status = ReservationStatus::from_str(status_str).map_err(invalid_column)?;

    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.try_get("reservation_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        status,
        reserved_at: row.try_get("reserved_at")?,
    })
}

/// ReservationRepositoryのPostgreSQL実装
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepositoryTrait for ReservationRepository {
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_RESERVATIONS);
        qb.push(" AND reservation_id = ")
            .push_bind(reservation_id.value());

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn list(&self, status: Option<ReservationStatus>) -> Result<Vec<Reservation>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_RESERVATIONS);
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY reserved_at DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn create(&self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id,
                member_id,
                book_id,
                status,
                reserved_at
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.member_id.value())
        .bind(reservation.book_id.value())
        .bind(reservation.status.as_str())
        .bind(reservation.reserved_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_status(
        &self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE reservations SET status = $2 WHERE reservation_id = $1")
            .bind(reservation_id.value())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
