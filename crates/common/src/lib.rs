//! Bookshelf Common Library
//!
//! Shared code for the Bookshelf catalog service including:
//! - Database models, schema bootstrap and repository
//! - Catalog domain rules (validation, ratings, saga progress, search)
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
