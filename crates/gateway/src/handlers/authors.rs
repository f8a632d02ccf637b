//! Author handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{repository, PageQuery};
use crate::AppState;
use bookshelf_common::{
    auth::AuthContext,
    catalog::AuthorDraft,
    db::{models::Author, AuthorDetail, Page},
    errors::Result,
};

/// List authors, 10 per page
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Author>>> {
    let page = repository(&state).list_authors(query.request(&state)).await?;
    Ok(Json(page))
}

/// Author with books, sagas and rating
pub async fn get_author(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(author_id): Path<Uuid>,
) -> Result<Json<AuthorDetail>> {
    Ok(Json(repository(&state).author_detail(author_id).await?))
}

pub async fn create_author(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<AuthorDraft>,
) -> Result<(StatusCode, Json<Author>)> {
    auth.require_staff()?;
    let author = repository(&state).create_author(&draft).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn update_author(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(author_id): Path<Uuid>,
    Json(draft): Json<AuthorDraft>,
) -> Result<Json<Author>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_author(author_id, &draft).await?))
}

pub async fn delete_author(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_author(author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
