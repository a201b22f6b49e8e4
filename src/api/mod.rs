//! HTTP read API over the persisted records
//!
//! This module serves:
//! - Read routes over the `books` table (`/api/v1/books`, search, categories)
//! - A health report including the latest pipeline run
//! - A JWT-protected trigger that runs the pipeline in the background
//!
//! At most one pipeline run is active per process. The API keeps its own
//! read connection; the pipeline opens a separate one for writing.

mod auth;
mod routes;

pub use auth::{authorize, verify_token, AuthError, Claims};
pub use routes::ApiError;

use crate::config::Config;
use crate::crawler::run_pipeline;
use crate::storage::{open_storage, SqliteStorage};
use crate::HarvestError;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub config: Arc<Config>,
    pub config_hash: Arc<str>,
    pub crawl_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(storage: SqliteStorage, config: Config, config_hash: &str) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            config: Arc::new(config),
            config_hash: Arc::from(config_hash),
            crawl_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(routes::root))
        .route("/books", get(routes::list_books))
        .route("/books/search", get(routes::search_books))
        .route("/books/:id", get(routes::get_book))
        .route("/categories", get(routes::list_categories))
        .route("/health", get(routes::health))
        .route("/scrape/trigger", post(routes::trigger_crawl));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the pipeline on a background task
///
/// The guard is held until the run finishes, keeping other triggers out.
pub fn spawn_pipeline(
    config: Arc<Config>,
    config_hash: Arc<str>,
    guard: OwnedMutexGuard<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _guard = guard;
        match run_pipeline(&config, &config_hash).await {
            Ok(report) => tracing::info!(
                "Background run {} finished: {} records persisted",
                report.run_id,
                report.persisted
            ),
            Err(e) => tracing::error!("Background run failed: {}", e),
        }
    })
}

/// Starts the API server and blocks until Ctrl-C
pub async fn serve(config: Config, config_hash: &str) -> Result<(), HarvestError> {
    let addr: SocketAddr = config.api.bind_address.parse().map_err(|_| {
        crate::ConfigError::Validation(format!(
            "api.bind-address is not a socket address: {}",
            config.api.bind_address
        ))
    })?;

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let state = AppState::new(storage, config, config_hash);

    if state.config.api.crawl_on_startup {
        if let Ok(guard) = state.crawl_lock.clone().try_lock_owned() {
            tracing::info!("Starting startup crawl in the background");
            spawn_pipeline(state.config.clone(), state.config_hash.clone(), guard);
        }
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on http://{}/api/v1", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
