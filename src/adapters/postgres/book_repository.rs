use crate::domain::book::{Book, BookFilter};
use crate::domain::value_objects::BookId;
use crate::ports::{BookRepository as BookRepositoryTrait, RepositoryError, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use super::error::contains_pattern;

/// 貸出可否は保存されたフラグではなく、未返却の貸出の有無から導出する
const AVAILABLE_EXPR: &str =
    "NOT EXISTS (SELECT 1 FROM loans l WHERE l.book_id = b.book_id AND l.returned_at IS NULL)";

fn select_books() -> String {
    format!(
        r#"
        SELECT
            b.book_id,
            b.title,
            b.isbn,
            b.author,
            b.publisher,
            b.publication_year,
            b.category,
            {AVAILABLE_EXPR} AS available
        FROM books b
        WHERE TRUE
        "#
    )
}

/// PostgreSQLの行データをBookに変換する
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        title: row.try_get("title")?,
        isbn: row.try_get("isbn")?,
        author: row.try_get("author")?,
        publisher: row.try_get("publisher")?,
        publication_year: row.try_get("publication_year")?,
        category: row.try_get("category")?,
        available: row.try_get("available")?,
    })
}

/// BookRepositoryのPostgreSQL実装
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let mut qb = QueryBuilder::<Postgres>::new(select_books());
        qb.push(" AND b.book_id = ").push_bind(book_id.value());

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut qb = QueryBuilder::<Postgres>::new(select_books());
        if let Some(available) = filter.available {
            qb.push(" AND ")
                .push(AVAILABLE_EXPR)
                .push(" = ")
                .push_bind(available);
        }
        if let Some(category) = &filter.category {
            qb.push(" AND b.category = ").push_bind(category.clone());
        }
        if let Some(author) = &filter.author {
            qb.push(" AND b.author ILIKE ")
                .push_bind(contains_pattern(author));
        }
        qb.push(" ORDER BY b.title ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_book).collect()
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let pattern = contains_pattern(query);
        let mut qb = QueryBuilder::<Postgres>::new(select_books());
        qb.push(" AND (");
        let mut separated = qb.separated(" OR ");
        for column in ["b.title", "b.author", "b.isbn", "b.publisher", "b.category"] {
            separated
                .push(format!("{column} ILIKE "))
                .push_bind_unseparated(pattern.clone());
        }
        qb.push(") ORDER BY b.title ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row_to_book).collect()
    }

    async fn create(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                book_id,
                title,
                isbn,
                author,
                publisher,
                publication_year,
                category,
                available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.category)
        .bind(book.available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<()> {
        // availableは貸出・返却のトランザクションでのみ書き換える
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2,
                isbn = $3,
                author = $4,
                publisher = $5,
                publication_year = $6,
                category = $7
            WHERE book_id = $1
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.category)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, book_id: BookId) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count(&self, available_only: bool) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM books b WHERE ($1 = FALSE OR {AVAILABLE_EXPR})"
        ))
        .bind(available_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
