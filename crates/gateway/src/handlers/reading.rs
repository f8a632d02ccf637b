//! Reading status, rating and review handlers
//!
//! Every route acts on the caller's own relation to a book.

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
    catalog::{RatingDraft, ReviewDraft, StatusDraft},
    db::{models::UserBookRelation, MyBookEntry, Page, StatusChange},
    errors::Result,
    metrics,
};

fn created_or_ok(change: StatusChange) -> (StatusCode, Json<StatusChange>) {
    let code = if change.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (code, Json(change))
}

pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
    Json(draft): Json<StatusDraft>,
) -> Result<(StatusCode, Json<StatusChange>)> {
    let status = draft.clean()?;
    let change = repository(&state)
        .set_status(auth.user_id, book_id, status)
        .await?;
    metrics::record_status_change(status.as_str());
    Ok(created_or_ok(change))
}

pub async fn remove_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode> {
    repository(&state).remove_status(auth.user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rate(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
    Json(draft): Json<RatingDraft>,
) -> Result<(StatusCode, Json<StatusChange>)> {
    let change = repository(&state)
        .rate(auth.user_id, book_id, draft.rating)
        .await?;
    metrics::record_opinion("rating");
    Ok(created_or_ok(change))
}

pub async fn clear_rating(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<Json<UserBookRelation>> {
    Ok(Json(repository(&state).clear_rating(auth.user_id, book_id).await?))
}

pub async fn review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<StatusChange>)> {
    let change = repository(&state)
        .review(auth.user_id, book_id, &draft.review)
        .await?;
    metrics::record_opinion("review");
    Ok(created_or_ok(change))
}

pub async fn clear_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<Uuid>,
) -> Result<Json<UserBookRelation>> {
    Ok(Json(repository(&state).clear_review(auth.user_id, book_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MyBooksQuery {
    pub page: Option<u64>,
    pub status: Option<String>,
}

/// The caller's books, optionally narrowed to one status
pub async fn my_books(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<MyBooksQuery>,
) -> Result<Json<Page<MyBookEntry>>> {
    let status = match query.status {
        Some(status) => Some(StatusDraft { status }.clean()?),
        None => None,
    };
    let request = PageQuery { page: query.page }.request(&state);
    let page = repository(&state)
        .my_books(auth.user_id, status, request)
        .await?;
    Ok(Json(page))
}
