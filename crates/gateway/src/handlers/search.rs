//! Search handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::repository;
use crate::AppState;
use bookshelf_common::{db::SearchResults, errors::Result, metrics};

/// `?q=` keyword
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub total_results: usize,
    pub processing_time_ms: u64,
    #[serde(flatten)]
    pub results: SearchResults,
}

/// Books, authors and sagas matching a keyword
///
/// A blank keyword yields empty results rather than an error.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    let results = repository(&state)
        .search(&query.q, state.config.catalog.search_limit)
        .await?;
    metrics::record_search(results.books.len());

    Ok(Json(SearchResponse {
        total_results: results.books.len(),
        processing_time_ms: start.elapsed().as_millis() as u64,
        results,
    }))
}
