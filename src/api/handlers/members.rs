use crate::application::catalog::members;
use crate::domain::{
    member::{MemberUpdate, NewMember},
    value_objects::MemberId,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{error::ApiError, types::MemberResponse};

/// POST /members - 会員を登録
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewMember>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    let member = members::register_member(&state.service_deps, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

/// GET /members - 会員一覧（登録日の新しい順）
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let members = members::list_members(&state.service_deps).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member = members::get_member(&state.service_deps, MemberId::from_uuid(member_id)).await?;
    Ok(Json(MemberResponse::from(member)))
}

/// PUT /members/:id - 会員情報の部分更新
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    Json(update): Json<MemberUpdate>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member =
        members::update_member(&state.service_deps, MemberId::from_uuid(member_id), update)
            .await?;
    Ok(Json(MemberResponse::from(member)))
}

/// DELETE /members/:id - 貸出記録のある会員は削除できない
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    members::delete_member(&state.service_deps, MemberId::from_uuid(member_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
