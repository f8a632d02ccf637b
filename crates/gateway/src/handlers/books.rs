//! Book handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{repository, PageQuery};
use crate::AppState;
use bookshelf_common::{
    auth::AuthContext,
    catalog::BookDraft,
    db::{models::Book, BookDetail, BookFilter, BookSummary, Page},
    errors::Result,
};

/// Query string of the book list
#[derive(Debug, Default, Deserialize)]
pub struct BookListQuery {
    pub page: Option<u64>,
    pub genre: Option<Uuid>,
    pub language: Option<Uuid>,
    pub author: Option<Uuid>,
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<Page<BookSummary>>> {
    let filter = BookFilter {
        genre_id: query.genre,
        language_id: query.language,
        author_id: query.author,
    };
    let request = PageQuery { page: query.page }.request(&state);
    Ok(Json(repository(&state).list_books(&filter, request).await?))
}

/// Book with genres, language, ratings, reviews and the caller's relation
pub async fn get_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookDetail>> {
    let detail = repository(&state)
        .book_detail(book_id, Some(auth.user_id))
        .await?;
    Ok(Json(detail))
}

pub async fn create_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Book>)> {
    auth.require_staff()?;
    let book = repository(&state).create_book(&draft).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
    Json(draft): Json<BookDraft>,
) -> Result<Json<Book>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_book(book_id, &draft).await?))
}

pub async fn delete_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
