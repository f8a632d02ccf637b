//! Saga handlers

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
    catalog::SagaDraft,
    db::{models::Saga, Page, SagaDetail},
    errors::Result,
};

pub async fn list_sagas(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Saga>>> {
    let page = repository(&state).list_sagas(query.request(&state)).await?;
    Ok(Json(page))
}

/// Saga with its books in volume order and the caller's progress
pub async fn get_saga(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(saga_id): Path<Uuid>,
) -> Result<Json<SagaDetail>> {
    let detail = repository(&state)
        .saga_detail(saga_id, Some(auth.user_id))
        .await?;
    Ok(Json(detail))
}

pub async fn create_saga(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<SagaDraft>,
) -> Result<(StatusCode, Json<Saga>)> {
    auth.require_staff()?;
    let saga = repository(&state).create_saga(&draft).await?;
    Ok((StatusCode::CREATED, Json(saga)))
}

pub async fn update_saga(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(saga_id): Path<Uuid>,
    Json(draft): Json<SagaDraft>,
) -> Result<Json<Saga>> {
    auth.require_staff()?;
    Ok(Json(repository(&state).update_saga(saga_id, &draft).await?))
}

pub async fn delete_saga(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(saga_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_staff()?;
    repository(&state).delete_saga(saga_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
