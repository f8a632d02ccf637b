//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support. Catalog drafts
//! are cleaned here, because several rules need related records.

mod authors;
mod books;
mod films;
mod lookups;
mod reading;
mod sagas;
mod search;
mod users;

pub use books::{BookDetail, BookFilter, ReaderEntry};
pub use authors::AuthorDetail;
pub use reading::{MyBookEntry, StatusChange};
pub use sagas::SagaDetail;
pub use search::SearchResults;

use crate::catalog::RatingSummary;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Page requested by a list endpoint (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page: per_page.max(1) }
    }

    /// Zero-based index of the page; pages past the end are not found,
    /// except page 1 of an empty list
    fn index(&self, total_pages: u64) -> Result<u64> {
        if self.page == 0 || (self.page > 1 && self.page > total_pages) {
            return Err(AppError::NotFound {
                resource_type: "page".to_string(),
                id: self.page.to_string(),
            });
        }
        Ok(self.page - 1)
    }
}

/// One page of a list
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub total: u64,
    pub is_paginated: bool,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, request: PageRequest, total: u64, total_pages: u64) -> Self {
        Self {
            items,
            page: request.page,
            total_pages,
            total,
            is_paginated: total_pages > 1,
        }
    }
}

/// Book as shown in lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub display_title: String,
    pub author_id: Uuid,
    pub author: String,
    pub saga_id: Option<Uuid>,
    pub saga_volume: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    pub cover_url: Option<String>,
    pub average_rating: Option<f64>,
}

/// Catalog size, shown on the landing page
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub books: u64,
    pub authors: u64,
    pub sagas: u64,
    pub genres: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Count the main catalog entities
    pub async fn stats(&self) -> Result<CatalogStats> {
        let conn = self.read_conn();
        Ok(CatalogStats {
            books: BookEntity::find().count(conn).await?,
            authors: AuthorEntity::find().count(conn).await?,
            sagas: SagaEntity::find().count(conn).await?,
            genres: GenreEntity::find().count(conn).await?,
        })
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Attach author names, saga names and average ratings to books
    async fn summarize_books(&self, books: Vec<Book>) -> Result<Vec<BookSummary>> {
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.read_conn();

        let author_ids: Vec<Uuid> = books.iter().map(|b| b.author_id).collect();
        let authors: HashMap<Uuid, Author> = AuthorEntity::find()
            .filter(AuthorColumn::Id.is_in(author_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let saga_ids: Vec<Uuid> = books.iter().filter_map(|b| b.saga_id).collect();
        let sagas: HashMap<Uuid, String> = if saga_ids.is_empty() {
            HashMap::new()
        } else {
            SagaEntity::find()
                .filter(SagaColumn::Id.is_in(saga_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect()
        };

        let book_ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();
        let ratings = self.ratings_by_book(book_ids).await?;

        Ok(books
            .into_iter()
            .map(|book| {
                let saga_name = book.saga_id.and_then(|id| sagas.get(&id)).map(String::as_str);
                let author = authors
                    .get(&book.author_id)
                    .map(Author::short_name)
                    .unwrap_or_default();
                let average_rating = ratings
                    .get(&book.id)
                    .and_then(|r| crate::catalog::average_rating(r));
                BookSummary {
                    id: book.id,
                    display_title: book.display_title(saga_name),
                    title: book.title,
                    author_id: book.author_id,
                    author,
                    saga_id: book.saga_id,
                    saga_volume: book.saga_volume,
                    publish_date: book.publish_date,
                    cover_url: book.cover_url,
                    average_rating,
                }
            })
            .collect())
    }

    /// Non-null ratings grouped by book
    async fn ratings_by_book(&self, book_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<i32>>> {
        let rows: Vec<(Uuid, Option<i32>)> = RelationEntity::find()
            .select_only()
            .column(RelationColumn::BookId)
            .column(RelationColumn::Rating)
            .filter(RelationColumn::BookId.is_in(book_ids))
            .filter(RelationColumn::Rating.is_not_null())
            .into_tuple()
            .all(self.read_conn())
            .await?;

        let mut grouped: HashMap<Uuid, Vec<i32>> = HashMap::new();
        for (book_id, rating) in rows {
            if let Some(rating) = rating {
                grouped.entry(book_id).or_default().push(rating);
            }
        }
        Ok(grouped)
    }

    /// Rating summary over every relation of the given books
    async fn rating_summary(&self, book_ids: Vec<Uuid>) -> Result<RatingSummary> {
        if book_ids.is_empty() {
            return Ok(RatingSummary::default());
        }
        let relations = RelationEntity::find()
            .filter(RelationColumn::BookId.is_in(book_ids))
            .all(self.read_conn())
            .await?;
        Ok(RatingSummary::from_relations(&relations))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::models::ReadingStatus;
    use crate::catalog::{AuthorDraft, BookDraft, SagaDraft};

    pub async fn repo() -> Repository {
        let pool = DbPool::new(&DatabaseConfig::in_memory()).await.unwrap();
        Repository::new(pool)
    }

    pub async fn author(repo: &Repository, first: &str, last: &str) -> Author {
        repo.create_author(&AuthorDraft {
            first_name: first.into(),
            last_name: last.into(),
            ..AuthorDraft::default()
        })
        .await
        .unwrap()
    }

    pub async fn saga(repo: &Repository, name: &str, author_id: Uuid) -> Saga {
        repo.create_saga(&SagaDraft {
            name: name.into(),
            author_id,
            description: None,
        })
        .await
        .unwrap()
    }

    pub fn book_draft(title: &str, author_id: Uuid) -> BookDraft {
        BookDraft {
            title: title.into(),
            author_id,
            saga_id: None,
            saga_volume: None,
            publish_date: None,
            summary: None,
            isbn: None,
            genre_ids: vec![],
            language_id: None,
            cover_url: None,
        }
    }

    pub async fn book(repo: &Repository, title: &str, author_id: Uuid) -> Book {
        repo.create_book(&book_draft(title, author_id)).await.unwrap()
    }

    pub async fn saga_book(
        repo: &Repository,
        title: &str,
        saga: &Saga,
        volume: i32,
    ) -> Book {
        let mut draft = book_draft(title, saga.author_id);
        draft.saga_id = Some(saga.id);
        draft.saga_volume = Some(volume);
        repo.create_book(&draft).await.unwrap()
    }

    pub async fn user(repo: &Repository, username: &str) -> User {
        repo.create_user(username, "reader@example.com", "Test", "Reader", "hash", false)
            .await
            .unwrap()
    }

    pub async fn mark(repo: &Repository, user: &User, book: &Book, status: ReadingStatus) {
        repo.set_status(user.id, book.id, status).await.unwrap();
    }
}
