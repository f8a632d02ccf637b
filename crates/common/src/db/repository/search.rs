use super::{BookSummary, Repository};
use crate::catalog::search::{union_by_key, LIKE_ESCAPE};
use crate::catalog::SearchTerms;
use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Condition, Expr, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Everything a keyword matched
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub books: Vec<BookSummary>,
    pub authors: Vec<Author>,
    pub sagas: Vec<Saga>,
}

/// `key_column LIKE pattern`; keys and patterns are both lower-cased in Rust
fn key_like<C: ColumnTrait>(column: C, pattern: String) -> SimpleExpr {
    Expr::col(column).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

impl Repository {
    // ========================================================================
    // Search Operations
    // ========================================================================

    /// Books whose title, author or saga matches the query
    ///
    /// Titles and saga names must contain the whole query; an author matches
    /// when every word of the query is part of their first or last name.
    pub async fn search(&self, query: &str, limit: u64) -> Result<SearchResults> {
        let terms = match SearchTerms::parse(query) {
            Some(terms) => terms,
            None => return Ok(SearchResults::default()),
        };
        let conn = self.read_conn();

        let by_title = BookEntity::find()
            .filter(key_like(BookColumn::TitleKey, terms.phrase_pattern()))
            .all(conn)
            .await?;

        let author_match = terms
            .token_patterns()
            .into_iter()
            .fold(Condition::all(), |cond, pattern| {
                cond.add(
                    Condition::any()
                        .add(key_like(AuthorColumn::FirstNameKey, pattern.clone()))
                        .add(key_like(AuthorColumn::LastNameKey, pattern)),
                )
            });
        let authors = AuthorEntity::find()
            .filter(author_match)
            .order_by_asc(AuthorColumn::LastName)
            .order_by_asc(AuthorColumn::FirstName)
            .all(conn)
            .await?;

        let sagas = SagaEntity::find()
            .filter(key_like(SagaColumn::NameKey, terms.phrase_pattern()))
            .order_by_asc(SagaColumn::Name)
            .all(conn)
            .await?;

        let by_author = if authors.is_empty() {
            Vec::new()
        } else {
            BookEntity::find()
                .filter(BookColumn::AuthorId.is_in(authors.iter().map(|a| a.id).collect::<Vec<Uuid>>()))
                .all(conn)
                .await?
        };
        let by_saga = if sagas.is_empty() {
            Vec::new()
        } else {
            BookEntity::find()
                .filter(BookColumn::SagaId.is_in(sagas.iter().map(|s| s.id).collect::<Vec<Uuid>>()))
                .all(conn)
                .await?
        };

        let mut books = union_by_key(vec![by_title, by_author, by_saga], |b| b.id);
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        books.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        debug!(
            query = %terms.phrase,
            books = books.len(),
            authors = authors.len(),
            sagas = sagas.len(),
            "Search completed"
        );

        Ok(SearchResults {
            query: terms.phrase,
            books: self.summarize_books(books).await?,
            authors,
            sagas,
        })
    }
}
