use crate::domain::book::{Book, BookFilter};
use crate::domain::value_objects::BookId;
use async_trait::async_trait;

use super::Result;

/// 書籍リポジトリポート
///
/// 返される`Book::available`は常に貸出記録から導出した値。
/// 貸出可否フラグはこのポートからは書き換えられない（`LoanRepository`のトランザクションのみ）。
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// タイトル昇順
    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>>;

    /// タイトル・著者・ISBN・出版社・分類の部分一致検索（大文字小文字を区別しない）
    async fn search(&self, query: &str) -> Result<Vec<Book>>;

    /// ISBNが重複する場合は`UniqueViolation`
    async fn create(&self, book: &Book) -> Result<()>;

    /// 書誌項目のみ更新する。存在しない場合は`NotFound`
    async fn update(&self, book: &Book) -> Result<()>;

    /// 貸出が参照している場合は`ForeignKeyViolation`
    async fn delete(&self, book_id: BookId) -> Result<()>;

    async fn count(&self, available_only: bool) -> Result<u64>;
}
