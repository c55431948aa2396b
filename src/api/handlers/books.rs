use crate::application::catalog::books;
use crate::domain::{
    book::{BookFilter, BookUpdate, NewBook},
    value_objects::BookId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    types::{BookResponse, ListBooksQuery, SearchBooksQuery},
};

/// POST /books - 書籍を登録
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewBook>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let book = books::add_book(&state.service_deps, input).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// GET /books - 書籍一覧（タイトル順、貸出回数付き）
///
/// クエリパラメータ:
/// - available: 貸出可否（貸出記録から導出）
/// - category: カテゴリの完全一致
/// - author: 著者名の部分一致（大文字小文字を区別しない）
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let filter = BookFilter {
        available: query.available,
        category: query.category,
        author: query.author,
    };

    let books = books::list_books(&state.service_deps, &filter).await?;
    let counted = books::with_loan_counts(&state.service_deps, books).await?;
    Ok(Json(counted.into_iter().map(BookResponse::from).collect()))
}

/// GET /books/search?q= - タイトル・著者・ISBN・出版社・カテゴリの横断検索
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchBooksQuery>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let q = query.q.unwrap_or_default();
    let books = books::search_books(&state.service_deps, &q).await?;
    let counted = books::with_loan_counts(&state.service_deps, books).await?;
    Ok(Json(counted.into_iter().map(BookResponse::from).collect()))
}

pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = books::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    let counted = books::count_loans(&state.service_deps, book).await?;
    Ok(Json(BookResponse::from(counted)))
}

/// PUT /books/:id - 書誌情報の部分更新（貸出可否は変更できない）
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(update): Json<BookUpdate>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = books::update_book(&state.service_deps, BookId::from_uuid(book_id), update).await?;
    Ok(Json(BookResponse::from(book)))
}

pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    books::remove_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
