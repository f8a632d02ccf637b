//! Film handlers

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
    catalog::FilmDraft,
    db::{models::Film, Page},
    errors::Result,
};

pub async fn list_films(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Film>>> {
    Ok(Json(repository(&state).list_films(query.request(&state)).await?))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(film_id): Path<Uuid>,
) -> Result<Json<Film>> {
    Ok(Json(repository(&state).get_film(film_id).await?))
}

pub async fn create_film(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<FilmDraft>,
) -> Result<(StatusCode, Json<Film>)> {
    auth.require_staff()?;
    let film = repository(&state).create_film(&draft).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn update_film(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(film_id): Path<Uuid>,
    Json(draft): Json<FilmDraft>,
) -> Result<Json<Film>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_film(film_id, &draft).await?))
}

pub async fn delete_film(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(film_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_film(film_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
