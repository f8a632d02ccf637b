//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use super::repository;
use crate::AppState;
use bookshelf_common::{db::CatalogStats, errors::Result};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness report, one entry per database connection
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub primary: ConnectionCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica: Option<ConnectionCheck>,
}

#[derive(Serialize)]
pub struct ConnectionCheck {
    pub up: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn check(result: Result<()>, start: Instant) -> ConnectionCheck {
    ConnectionCheck {
        up: result.is_ok(),
        latency_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|e| e.to_string()),
    }
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: bookshelf_common::VERSION.to_string(),
    })
}

/// Readiness probe: 503 until every configured connection answers
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();
    let primary = check(state.db.ping_primary().await, start);
    let start = Instant::now();
    let replica = state
        .db
        .ping_replica()
        .await
        .map(|result| check(result, start));

    let ready = primary.up && replica.as_ref().map_or(true, |r| r.up);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready, primary, replica }))
}

/// Catalog counts for the landing page
pub async fn stats(State(state): State<AppState>) -> Result<Json<CatalogStats>> {
    Ok(Json(repository(&state).stats().await?))
}
