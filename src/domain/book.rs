use serde::{Deserialize, Serialize};
use validator::Validate;

use super::BookId;

/// 書籍
///
/// `available`は読み出し時に「未返却の貸出が存在しない」ことから導出される。
/// 書き込みは貸出・返却のトランザクション内でのみ行う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub isbn: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub available: bool,
}

/// 蔵書登録の入力
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBook {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "isbn is required"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "publication_year is out of range"))]
    pub publication_year: Option<i32>,
    pub category: Option<String>,
}

/// 書籍情報の部分更新（貸出可否は含まない）
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookUpdate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: Option<String>,
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "publication_year is out of range"))]
    pub publication_year: Option<i32>,
    pub category: Option<String>,
}

/// 書籍一覧の絞り込み条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub available: Option<bool>,
    /// 完全一致
    pub category: Option<String>,
    /// 大文字小文字を区別しない部分一致
    pub author: Option<String>,
}

impl Book {
    pub fn catalog(input: NewBook) -> Self {
        Self {
            book_id: BookId::new(),
            title: input.title,
            isbn: input.isbn,
            author: input.author,
            publisher: input.publisher,
            publication_year: input.publication_year,
            category: input.category,
            available: true,
        }
    }

    pub fn apply(&self, update: BookUpdate) -> Self {
        Self {
            title: update.title.unwrap_or_else(|| self.title.clone()),
            isbn: update.isbn.unwrap_or_else(|| self.isbn.clone()),
            author: update.author.unwrap_or_else(|| self.author.clone()),
            publisher: update.publisher.or_else(|| self.publisher.clone()),
            publication_year: update.publication_year.or(self.publication_year),
            category: update.category.or_else(|| self.category.clone()),
            ..self.clone()
        }
    }

    /// 検索語が書誌項目のいずれかに含まれるか（大文字小文字は区別しない）
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [
            Some(self.title.as_str()),
            Some(self.author.as_str()),
            Some(self.isbn.as_str()),
            self.publisher.as_deref(),
            self.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(available) = self.available {
            if book.available != available {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if book.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !book.author.to_lowercase().contains(&author.to_lowercase()) {
                return false;
            }
        }
        true
    }
}
