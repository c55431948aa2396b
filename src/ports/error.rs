use thiserror::Error;

/// 永続化ゲートウェイのエラー
///
/// ストア固有のエラーコードはアダプター層でこの閉じた集合に変換する。
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 対象の行が存在しない
    #[error("record not found")]
    NotFound,

    /// 一意制約違反（email, ISBN, 書籍ごとの未返却貸出）
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// 外部キー制約違反（参照中の行の削除など）
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// 並行更新との競合（直列化失敗、更新前提の不成立）
    #[error("concurrent update conflict")]
    Conflict,

    /// 一時的な障害（接続プールのタイムアウトなど）
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// その他のストアのエラー
    #[error("storage error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
