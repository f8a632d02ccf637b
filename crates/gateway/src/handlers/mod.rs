//! API handlers module

pub mod accounts;
pub mod authors;
pub mod books;
pub mod films;
pub mod health;
pub mod lookups;
pub mod reading;
pub mod sagas;
pub mod search;

use crate::AppState;
use bookshelf_common::db::{PageRequest, Repository};
use serde::Deserialize;

/// `?page=N` on list endpoints (1-based, default 1)
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    pub fn request(&self, state: &AppState) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), state.config.catalog.page_size)
    }
}

pub fn repository(state: &AppState) -> Repository {
    Repository::new(state.db.clone())
}
