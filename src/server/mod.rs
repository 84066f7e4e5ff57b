//! Axum HTTP surface — serves the unified study API under `/api`.
//!
//! The frontend speaks a single-endpoint protocol: every request is a
//! `POST /api` with a JSON body tagged by an `action` field. `GET
//! /api/health` reports liveness. The server applies permissive CORS
//! because the API is called straight from a browser frontend, and wires
//! a [`CancellationToken`] into axum's graceful shutdown.

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::providers;
use crate::study::StudyService;

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — the service is clonable and the rest is small data.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StudyService>,
    /// Default character cap for `extractText` when the request omits one.
    pub extract_max_chars: usize,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: StudyService, extract_max_chars: usize) -> Self {
        Self {
            service: Arc::new(service),
            extract_max_chars,
            started_at: Utc::now(),
        }
    }
}

/// Run the HTTP server until `shutdown` is cancelled.
pub async fn run(config: Config, shutdown: CancellationToken) -> Result<(), AppError> {
    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;

    let service = StudyService::new(
        provider,
        config.prompts_dir.clone(),
        config.llm.anthropic.max_tokens,
        config.llm.anthropic.keyword_max_tokens,
        std::time::Duration::from_secs(config.llm.anthropic.throttle_retry_seconds),
    );

    let state = AppState::new(service, config.extract_max_chars);
    let router = build_router(state);

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", config.bind)))?;

    info!(bind = %config.bind, provider = %config.llm.provider, "api server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("api server shut down");
    Ok(())
}

/// Build the router. Separate from [`run`] so integration tests can drive
/// the handlers without binding a socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api", post(api::dispatch))
        .route("/api/health", get(api::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
