//! Database layer for Bookshelf
//!
//! Provides:
//! - SeaORM entity models
//! - Schema bootstrap
//! - Repository pattern for data access
//! - Connection pool management

pub mod models;
pub mod schema;
mod repository;

pub use repository::{
    AuthorDetail, BookDetail, BookFilter, BookSummary, CatalogStats, MyBookEntry, Page,
    PageRequest, ReaderEntry, Repository, SagaDetail, SearchResults, StatusChange,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e)
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e)
                })?;

            Some(replica_conn)
        } else {
            None
        };

        if config.create_schema {
            schema::create_schema(&primary).await?;
        }

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the primary connection
    pub async fn ping_primary(&self) -> Result<()> {
        ping(&self.primary, "Primary").await
    }

    /// Ping the read replica, if one is configured
    pub async fn ping_replica(&self) -> Option<Result<()>> {
        match self.replica {
            Some(ref replica) => Some(ping(replica, "Replica").await),
            None => None,
        }
    }

    /// Ping every connection
    pub async fn ping(&self) -> Result<()> {
        self.ping_primary().await?;
        self.ping_replica().await.transpose()?;
        Ok(())
    }
}

async fn ping(conn: &DatabaseConnection, which: &str) -> Result<()> {
    conn.ping().await.map_err(|e| AppError::ServiceUnavailable {
        message: format!("{} ping failed: {}", which, e),
    })
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(true);

    // An in-memory SQLite database lives only as long as its connection
    if !url.contains(":memory:") {
        opts.idle_timeout(Duration::from_secs(config.idle_timeout_secs));
    }

    opts
}
