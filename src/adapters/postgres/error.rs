use crate::ports::RepositoryError;

/// PostgreSQLのSQLSTATE: serialization_failure
const SERIALIZATION_FAILURE: &str = "40001";
/// PostgreSQLのSQLSTATE: deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";

/// sqlxのエラーをゲートウェイのエラー種別に変換する
///
/// 制約違反・競合・一時障害をここで一度だけ判別し、上位層ではSQLSTATEを扱わない。
impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return RepositoryError::UniqueViolation(constraint);
            }
            if db.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation(constraint);
            }
            if matches!(
                db.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ) {
                return RepositoryError::Conflict;
            }
        }

        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::PoolTimedOut => {
                RepositoryError::Unavailable("connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => {
                RepositoryError::Unavailable("connection pool closed".to_string())
            }
            sqlx::Error::Io(e) => RepositoryError::Unavailable(e.to_string()),
            other => RepositoryError::Backend(Box::new(other)),
        }
    }
}

/// 列の値がドメインの型に変換できない場合のエラー
pub(super) fn invalid_column(message: String) -> RepositoryError {
    RepositoryError::Backend(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

/// LIKE句のワイルドカードをエスケープし、部分一致のパターンにする
pub(super) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
