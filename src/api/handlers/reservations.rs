use crate::application::catalog::reservations;
use crate::domain::value_objects::{BookId, MemberId, ReservationId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    types::{
        ListReservationsQuery, ReservationRequest, ReservationResponse, parse_reservation_status,
    },
};

/// POST /reservations - 書籍を予約
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let reservation = reservations::reserve_book(
        &state.service_deps,
        MemberId::from_uuid(req.member_id),
        BookId::from_uuid(req.book_id),
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse::from(reservation)),
    ))
}

/// GET /reservations - 予約一覧（予約日の新しい順）
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_reservation_status)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let reservations = reservations::list_reservations(&state.service_deps, status).await?;
    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}

/// DELETE /reservations/:id - 予約を取り消す（記録は残る）
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = reservations::cancel_reservation(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;
    Ok(Json(ReservationResponse::from(reservation)))
}
