use crate::ports::RepositoryError;
use thiserror::Error;

/// 会員・蔵書・予約管理のエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 入力値が不正
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Member not found")]
    MemberNotFound,

    #[error("Book not found")]
    BookNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Email already in use")]
    DuplicateEmail,

    #[error("ISBN already in use")]
    DuplicateIsbn,

    /// 貸出記録が残っている会員は削除できない
    #[error("Member has loan records")]
    MemberHasLoans,

    /// 貸出記録が残っている書籍は削除できない
    #[error("Book has loan records")]
    BookHasLoans,

    #[error("Reservation already cancelled")]
    ReservationAlreadyCancelled,

    #[error("Repository error")]
    Repository(#[source] RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        CatalogError::Repository(err)
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CatalogError::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
