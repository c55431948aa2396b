use crate::application::catalog::CatalogError;
use crate::application::loan::{LoanApplicationError, LoanErrorKind};
use crate::ports::RepositoryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Loan(LoanApplicationError),
    Catalog(CatalogError),
    /// クエリパラメータなどリクエスト自体の不備
    BadRequest(String),
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

/// リポジトリ障害のレスポンス
///
/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す。
fn repository_failure(err: &RepositoryError) -> (StatusCode, &'static str, String) {
    match err {
        RepositoryError::Unavailable(reason) => {
            tracing::error!("Storage unavailable: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Storage is temporarily unavailable".to_string(),
            )
        }
        other => {
            tracing::error!("Repository error: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An unexpected error occurred".to_string(),
            )
        }
    }
}

fn loan_failure(err: &LoanApplicationError) -> (StatusCode, &'static str, String) {
    if let LoanApplicationError::Repository(e) = err {
        return repository_failure(e);
    }

    let (status, code) = match err.kind() {
        // 404 Not Found - 会員・書籍・貸出が存在しない
        LoanErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        // 422 Unprocessable Entity - 会員側の条件を満たしていない
        LoanErrorKind::InvalidMember => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_MEMBER"),
        LoanErrorKind::Ineligible => (StatusCode::UNPROCESSABLE_ENTITY, "INELIGIBLE"),
        // 409 Conflict - 書籍・貸出の現在の状態と衝突
        LoanErrorKind::Unavailable => (StatusCode::CONFLICT, "UNAVAILABLE"),
        LoanErrorKind::AlreadyReturned => (StatusCode::CONFLICT, "ALREADY_RETURNED"),
        LoanErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        LoanErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, code, err.to_string())
}

fn catalog_failure(err: &CatalogError) -> (StatusCode, &'static str, String) {
    let (status, code) = match err {
        CatalogError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CatalogError::MemberNotFound
        | CatalogError::BookNotFound
        | CatalogError::ReservationNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CatalogError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
        CatalogError::DuplicateIsbn => (StatusCode::CONFLICT, "DUPLICATE_ISBN"),
        CatalogError::MemberHasLoans | CatalogError::BookHasLoans => {
            (StatusCode::CONFLICT, "HAS_LOANS")
        }
        CatalogError::ReservationAlreadyCancelled => (StatusCode::CONFLICT, "ALREADY_CANCELLED"),
        CatalogError::Repository(e) => return repository_failure(e),
    };
    (status, code, err.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Loan(err) => loan_failure(err),
            ApiError::Catalog(err) => catalog_failure(err),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_loan_error_kinds_map_to_status_codes() {
        assert_eq!(status_of(LoanApplicationError::LoanNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(LoanApplicationError::InactiveMember),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(LoanApplicationError::LoanLimitReached { limit: 5 }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(LoanApplicationError::BookUnavailable), StatusCode::CONFLICT);
        assert_eq!(status_of(LoanApplicationError::AlreadyReturned), StatusCode::CONFLICT);
        assert_eq!(status_of(LoanApplicationError::Conflict), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_unavailable_is_503() {
        let err = LoanApplicationError::Repository(RepositoryError::Unavailable(
            "pool timed out".to_string(),
        ));
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);

        let err = CatalogError::Repository(RepositoryError::Unavailable("closed".to_string()));
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_catalog_errors_map_to_status_codes() {
        assert_eq!(
            status_of(CatalogError::Validation("email".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(CatalogError::MemberNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CatalogError::DuplicateIsbn), StatusCode::CONFLICT);
        assert_eq!(status_of(CatalogError::BookHasLoans), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CatalogError::Repository(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request() {
        assert_eq!(
            status_of(ApiError::BadRequest("status".to_string())),
            StatusCode::BAD_REQUEST
        );
    }
}
