use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{AppState, books, loans, members, reservations, stats};
use super::types::IndexResponse;

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /stats",
    "GET|POST /members",
    "GET|PUT|DELETE /members/:id",
    "GET /members/:id/loans",
    "GET /members/:id/eligibility",
    "GET|POST /books",
    "GET /books/search?q=",
    "GET|PUT|DELETE /books/:id",
    "GET|POST /loans",
    "GET /loans/overdue",
    "POST /loans/overdue/sweep",
    "GET /loans/:id",
    "POST /loans/:id/return",
    "GET|POST /reservations",
    "DELETE /reservations/:id",
];

/// APIルーターを作成する
///
/// 貸出系:
/// - POST /loans - 貸出
/// - POST /loans/:id/return - 返却
/// - POST /loans/overdue/sweep - 延滞スイープ
/// - GET /loans, /loans/:id, /loans/overdue
///
/// 会員・書籍・予約はCRUD、/statsは集計。
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/stats", get(stats::library_stats))
        // Members
        .route(
            "/members",
            post(members::create_member).get(members::list_members),
        )
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/members/:id/loans", get(loans::list_member_loans))
        .route("/members/:id/eligibility", get(loans::member_eligibility))
        // Books
        .route("/books", post(books::create_book).get(books::list_books))
        .route("/books/search", get(books::search_books))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Loans
        .route("/loans", post(loans::create_loan).get(loans::list_loans))
        .route("/loans/overdue", get(loans::list_overdue))
        .route("/loans/overdue/sweep", post(loans::sweep_overdue))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        // Reservations
        .route(
            "/reservations",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route(
            "/reservations/:id",
            delete(reservations::cancel_reservation),
        )
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// 利用可能なエンドポイントの一覧
async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}
