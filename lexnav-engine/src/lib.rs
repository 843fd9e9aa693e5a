//! lexnav-engine library interface
//!
//! Exposes the engine services and HTTP router for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, EngineError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::models::DocumentTree;
use crate::services::{Oracle, ResultStore};

/// Handle to an in-flight traversal run.
#[derive(Clone)]
pub struct RunHandle {
    pub token: CancellationToken,
    pub started_at: DateTime<Utc>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<EngineSettings>,
    /// Preloaded, validated statute tree
    pub tree: Arc<DocumentTree>,
    pub oracle: Arc<dyn Oracle>,
    pub store: Arc<ResultStore>,
    /// Cancellation handles for active traversal runs
    pub active_runs: Arc<RwLock<HashMap<Uuid, RunHandle>>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        settings: Arc<EngineSettings>,
        tree: Arc<DocumentTree>,
        oracle: Arc<dyn Oracle>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            settings,
            tree,
            oracle,
            store,
            active_runs: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::traversal_routes())
        .merge(api::health_routes())
        .with_state(state)
}
