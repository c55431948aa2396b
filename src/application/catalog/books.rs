use crate::application::ServiceDependencies;
use crate::domain::book::{Book, BookFilter, BookUpdate, NewBook};
use crate::domain::value_objects::BookId;
use crate::ports::{LoanFilter, RepositoryError};
use validator::Validate;

use super::errors::{CatalogError, Result};

fn map_write_error(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::UniqueViolation(_) => CatalogError::DuplicateIsbn,
        RepositoryError::NotFound => CatalogError::BookNotFound,
        other => CatalogError::from(other),
    }
}

/// 貸出回数（返却済みを含む）を添えた書籍
#[derive(Debug, Clone, PartialEq)]
pub struct BookWithLoanCount {
    pub book: Book,
    pub loans_count: u64,
}

/// 各書籍に貸出回数を添える
pub async fn with_loan_counts(
    deps: &ServiceDependencies,
    books: Vec<Book>,
) -> Result<Vec<BookWithLoanCount>> {
    let counts = futures::future::try_join_all(books.iter().map(|book| async move {
        let filter = LoanFilter::default().for_book(book.book_id);
        deps.loans.count(&filter).await
    }))
    .await?;

    Ok(books
        .into_iter()
        .zip(counts)
        .map(|(book, loans_count)| BookWithLoanCount { book, loans_count })
        .collect())
}

pub async fn count_loans(deps: &ServiceDependencies, book: Book) -> Result<BookWithLoanCount> {
    let loans_count = deps
        .loans
        .count(&LoanFilter::default().for_book(book.book_id))
        .await?;
    Ok(BookWithLoanCount { book, loans_count })
}

/// 蔵書を登録する（貸出可能な状態で登録）
pub async fn add_book(deps: &ServiceDependencies, input: NewBook) -> Result<Book> {
    input.validate()?;

    let book = Book::catalog(input);
    deps.books.create(&book).await.map_err(map_write_error)?;

    tracing::info!(book_id = %book.book_id, isbn = %book.isbn, "Book added");
    Ok(book)
}

pub async fn list_books(deps: &ServiceDependencies, filter: &BookFilter) -> Result<Vec<Book>> {
    Ok(deps.books.list(filter).await?)
}

/// 書誌項目の横断検索
pub async fn search_books(deps: &ServiceDependencies, query: &str) -> Result<Vec<Book>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CatalogError::Validation(
            "search query 'q' is required".to_string(),
        ));
    }
    Ok(deps.books.search(query).await?)
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.books
        .find_by_id(book_id)
        .await?
        .ok_or(CatalogError::BookNotFound)
}

/// 書誌項目を部分更新する。貸出可否はここでは変更できない。
pub async fn update_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    update: BookUpdate,
) -> Result<Book> {
    update.validate()?;

    let book = get_book(deps, book_id).await?.apply(update);
    deps.books.update(&book).await.map_err(map_write_error)?;

    Ok(book)
}

/// 蔵書を除籍する。貸出記録がある場合は削除不可。
pub async fn remove_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    deps.books.delete(book_id).await.map_err(|e| match e {
        RepositoryError::NotFound => CatalogError::BookNotFound,
        RepositoryError::ForeignKeyViolation(_) => CatalogError::BookHasLoans,
        other => CatalogError::from(other),
    })?;

    tracing::info!(%book_id, "Book removed");
    Ok(())
}
