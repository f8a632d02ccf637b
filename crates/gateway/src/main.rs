//! Bookshelf API Gateway
//!
//! The HTTP entry point of the catalog.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use bookshelf_common::{
    auth::{generate_secret, JwtManager},
    config::AppConfig,
    db::DbPool,
    metrics,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimit};
use crate::middleware::request_metrics::track_metrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting Bookshelf API Gateway v{}",
        bookshelf_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install()?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let secret = match config.auth.jwt_secret.clone() {
        Some(secret) => secret,
        None => {
            warn!("No auth.jwt_secret configured; tokens will not survive a restart");
            generate_secret()
        }
    };
    let jwt = Arc::new(JwtManager::new(&secret, config.auth.jwt_expiration_secs));

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        jwt,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/stats", get(handlers::health::stats))

        // Authors
        .route(
            "/authors",
            get(handlers::authors::list_authors).post(handlers::authors::create_author),
        )
        .route(
            "/authors/{id}",
            get(handlers::authors::get_author)
                .put(handlers::authors::update_author)
                .delete(handlers::authors::delete_author),
        )

        // Sagas
        .route(
            "/sagas",
            get(handlers::sagas::list_sagas).post(handlers::sagas::create_saga),
        )
        .route(
            "/sagas/{id}",
            get(handlers::sagas::get_saga)
                .put(handlers::sagas::update_saga)
                .delete(handlers::sagas::delete_saga),
        )

        // Books
        .route(
            "/books",
            get(handlers::books::list_books).post(handlers::books::create_book),
        )
        .route(
            "/books/{id}",
            get(handlers::books::get_book)
                .put(handlers::books::update_book)
                .delete(handlers::books::delete_book),
        )

        // Reading status, ratings and reviews
        .route(
            "/books/{id}/status",
            post(handlers::reading::set_status).delete(handlers::reading::remove_status),
        )
        .route(
            "/books/{id}/rating",
            post(handlers::reading::rate).delete(handlers::reading::clear_rating),
        )
        .route(
            "/books/{id}/review",
            post(handlers::reading::review).delete(handlers::reading::clear_review),
        )
        .route("/my-books", get(handlers::reading::my_books))

        // Lookups
        .route(
            "/genres",
            get(handlers::lookups::list_genres).post(handlers::lookups::create_genre),
        )
        .route(
            "/genres/{id}",
            get(handlers::lookups::get_genre)
                .put(handlers::lookups::update_genre)
                .delete(handlers::lookups::delete_genre),
        )
        .route(
            "/languages",
            get(handlers::lookups::list_languages).post(handlers::lookups::create_language),
        )
        .route(
            "/languages/{id}",
            get(handlers::lookups::get_language)
                .put(handlers::lookups::update_language)
                .delete(handlers::lookups::delete_language),
        )

        // Search
        .route("/search", get(handlers::search::search))

        // Films
        .route(
            "/films",
            get(handlers::films::list_films).post(handlers::films::create_film),
        )
        .route(
            "/films/{id}",
            get(handlers::films::get_film)
                .put(handlers::films::update_film)
                .delete(handlers::films::delete_film),
        )

        // Accounts
        .route("/accounts/register", post(handlers::accounts::register))
        .route("/accounts/login", post(handlers::accounts::login))
        .route(
            "/accounts/profile",
            get(handlers::accounts::get_profile)
                .put(handlers::accounts::update_profile)
                .delete(handlers::accounts::delete_account),
        )
        .route("/accounts/password", post(handlers::accounts::change_password));

    if state.config.rate_limit.enabled {
        let limit = RateLimit::new(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        api_routes = api_routes.layer(from_fn_with_state(limit, rate_limit_middleware));
    }

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(from_fn(track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests;
