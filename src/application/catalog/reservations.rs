use crate::application::ServiceDependencies;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::value_objects::{BookId, MemberId, ReservationId};
use crate::ports::RepositoryError;
use chrono::{DateTime, Utc};

use super::errors::{CatalogError, Result};

/// 書籍を予約する
///
/// 会員と書籍の存在のみ確認する。貸出状況とは無関係に受け付ける。
pub async fn reserve_book(
    deps: &ServiceDependencies,
    member_id: MemberId,
    book_id: BookId,
    now: DateTime<Utc>,
) -> Result<Reservation> {
    deps.members
        .find_by_id(member_id)
        .await?
        .ok_or(CatalogError::MemberNotFound)?;
    deps.books
        .find_by_id(book_id)
        .await?
        .ok_or(CatalogError::BookNotFound)?;

    let reservation = Reservation::place(member_id, book_id, now);
    deps.reservations
        .create(&reservation)
        .await
        .map_err(|e| match e {
            // 確認後に会員または書籍が削除された
            RepositoryError::ForeignKeyViolation(_) => CatalogError::BookNotFound,
            other => CatalogError::from(other),
        })?;

    tracing::info!(reservation_id = %reservation.reservation_id, "Reservation placed");
    Ok(reservation)
}

pub async fn list_reservations(
    deps: &ServiceDependencies,
    status: Option<ReservationStatus>,
) -> Result<Vec<Reservation>> {
    Ok(deps.reservations.list(status).await?)
}

/// 予約を取り消す（記録は残し、ステータスをCancelledにする）
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    let reservation = deps
        .reservations
        .find_by_id(reservation_id)
        .await?
        .ok_or(CatalogError::ReservationNotFound)?;

    let cancelled = reservation
        .cancel()
        .map_err(|_| CatalogError::ReservationAlreadyCancelled)?;

    deps.reservations
        .update_status(reservation_id, cancelled.status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::ReservationNotFound,
            other => CatalogError::from(other),
        })?;

    Ok(cancelled)
}
