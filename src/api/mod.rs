//! HTTP surface.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /health` | [`handlers::health`] |
//! | `POST /api/analyze` | [`handlers::analyze`] |
//! | `POST /api/emotion` | [`handlers::emotion`] |
//! | `POST /api/aspect` | [`handlers::aspect`] |
//! | `POST /api/batch` | [`handlers::batch`] |
//! | `GET /api/history` | [`handlers::history`] |
//! | `POST /api/clear-history` | [`handlers::clear_history`] |
//!
//! Anything else is served from the static directory.

pub mod error;
pub mod handlers;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::analyzer::Analyzer;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/emotion", post(handlers::emotion))
        .route("/api/aspect", post(handlers::aspect))
        .route("/api/batch", post(handlers::batch))
        .route("/api/history", get(handlers::history))
        .route("/api/clear-history", post(handlers::clear_history))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
