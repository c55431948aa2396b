use crate::ports::RepositoryError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 会員が存在しない
    #[error("Member not found")]
    MemberNotFound,

    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 会員が無効化されている
    #[error("Member is inactive")]
    InactiveMember,

    /// 書籍が貸出中
    #[error("Book is currently on loan")]
    BookUnavailable,

    /// 貸出上限に達している
    #[error("Loan limit reached (max {limit} books)")]
    LoanLimitReached { limit: u32 },

    /// 会員に延滞中の貸出がある
    #[error("Member has an overdue loan")]
    MemberHasOverdueLoan,

    /// 既に返却済み
    #[error("Loan already returned")]
    AlreadyReturned,

    /// 並行する更新と競合した
    #[error("Concurrent update conflict")]
    Conflict,

    /// リポジトリのエラー
    #[error("Repository error")]
    Repository(#[source] RepositoryError),
}

/// 呼び出し側に公開するエラー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanErrorKind {
    NotFound,
    InvalidMember,
    Unavailable,
    Ineligible,
    AlreadyReturned,
    Conflict,
    Internal,
}

impl LoanApplicationError {
    pub fn kind(&self) -> LoanErrorKind {
        match self {
            LoanApplicationError::MemberNotFound
            | LoanApplicationError::BookNotFound
            | LoanApplicationError::LoanNotFound => LoanErrorKind::NotFound,
            LoanApplicationError::InactiveMember => LoanErrorKind::InvalidMember,
            LoanApplicationError::BookUnavailable => LoanErrorKind::Unavailable,
            LoanApplicationError::LoanLimitReached { .. }
            | LoanApplicationError::MemberHasOverdueLoan => LoanErrorKind::Ineligible,
            LoanApplicationError::AlreadyReturned => LoanErrorKind::AlreadyReturned,
            LoanApplicationError::Conflict => LoanErrorKind::Conflict,
            LoanApplicationError::Repository(_) => LoanErrorKind::Internal,
        }
    }
}

impl From<RepositoryError> for LoanApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict | RepositoryError::UniqueViolation(_) => {
                LoanApplicationError::Conflict
            }
            other => LoanApplicationError::Repository(other),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
