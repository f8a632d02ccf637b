//! Genre and language handlers

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
    catalog::{GenreDraft, LanguageDraft},
    db::{
        models::{Genre, Language},
        Page,
    },
    errors::Result,
};

// ============================================================================
// Genres
// ============================================================================

pub async fn list_genres(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Genre>>> {
    Ok(Json(repository(&state).list_genres(query.request(&state)).await?))
}

pub async fn get_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<Uuid>,
) -> Result<Json<Genre>> {
    Ok(Json(repository(&state).get_genre(genre_id).await?))
}

pub async fn create_genre(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<GenreDraft>,
) -> Result<(StatusCode, Json<Genre>)> {
    auth.require_staff()?;
    let genre = repository(&state).create_genre(&draft).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn update_genre(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(genre_id): Path<Uuid>,
    Json(draft): Json<GenreDraft>,
) -> Result<Json<Genre>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_genre(genre_id, &draft).await?))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(genre_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_genre(genre_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Languages
// ============================================================================

pub async fn list_languages(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Language>>> {
    Ok(Json(repository(&state).list_languages(query.request(&state)).await?))
}

pub async fn get_language(
    State(state): State<AppState>,
    Path(language_id): Path<Uuid>,
) -> Result<Json<Language>> {
    Ok(Json(repository(&state).get_language(language_id).await?))
}

pub async fn create_language(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<LanguageDraft>,
) -> Result<(StatusCode, Json<Language>)> {
    auth.require_staff()?;
    let language = repository(&state).create_language(&draft).await?;
    Ok((StatusCode::CREATED, Json(language)))
}

pub async fn update_language(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(language_id): Path<Uuid>,
    Json(draft): Json<LanguageDraft>,
) -> Result<Json<Language>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_language(language_id, &draft).await?))
}

pub async fn delete_language(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(language_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_language(language_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
