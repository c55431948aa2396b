use crate::application::catalog::{LibraryStats, stats};
use axum::{Json, extract::State};
use chrono::Utc;
use std::sync::Arc;

use super::AppState;
use crate::api::error::ApiError;

/// GET /stats - 図書館全体の集計
pub async fn library_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LibraryStats>, ApiError> {
    let stats = stats::library_stats(&state.service_deps, Utc::now()).await?;
    Ok(Json(stats))
}
