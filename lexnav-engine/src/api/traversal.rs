//! Traversal API handlers
//!
//! POST /traversal/start, GET/DELETE /traversal/latest,
//! GET /traversal/active, POST /traversal/cancel/{run_id}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::TraversalResult;
use crate::services::{document_normalizer, tree_validator, TraversalDriver};
use crate::{AppState, RunHandle};

/// POST /traversal/start request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTraversalRequest {
    /// Opaque structured case description included in every oracle prompt
    pub case_information: Value,
    /// Raw document override; the preloaded statute is used when absent
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// GET /traversal/active response entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// POST /traversal/start
///
/// Runs the full traversal synchronously and returns the result object.
/// The Result Store is updated on success; a store failure degrades the
/// latest-result accessors but never this response.
pub async fn start_traversal(
    State(state): State<AppState>,
    Json(request): Json<StartTraversalRequest>,
) -> ApiResult<Json<TraversalResult>> {
    if request.case_information.is_null() {
        return Err(ApiError::BadRequest(
            "caseInformation must not be null".to_string(),
        ));
    }

    let max_depth = request.max_depth.unwrap_or(state.settings.max_depth);
    if max_depth == 0 {
        return Err(ApiError::BadRequest("maxDepth must be at least 1".to_string()));
    }
    let threshold = request
        .threshold
        .unwrap_or(state.settings.relevance_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ApiError::BadRequest(
            "threshold must be within [0, 1]".to_string(),
        ));
    }

    // Per-request document override, normalised and validated up front so
    // malformed input aborts before any oracle call.
    let tree = match &request.document {
        Some(raw) => {
            let tree = document_normalizer::normalize(raw)?;
            tree_validator::validate(&tree)?;
            Arc::new(tree)
        }
        None => state.tree.clone(),
    };

    let run_id = Uuid::new_v4();
    let token = CancellationToken::new();
    state.active_runs.write().await.insert(
        run_id,
        RunHandle {
            token: token.clone(),
            started_at: Utc::now(),
        },
    );

    tracing::info!(run_id = %run_id, max_depth, threshold, "Traversal run accepted");

    let driver = TraversalDriver::new(state.oracle.clone(), max_depth, threshold);
    let outcome = driver
        .run(run_id, &tree, request.case_information, &token)
        .await;

    state.active_runs.write().await.remove(&run_id);

    let result = outcome?;

    // A cancelled run never reaches this point, so the previous slot stays
    // authoritative on cancellation.
    if let Err(e) = state.store.commit(&result) {
        tracing::warn!(
            run_id = %run_id,
            error = %e,
            "Result store write failed; returning in-memory result"
        );
    }

    Ok(Json(result))
}

/// GET /traversal/latest
pub async fn latest_result(State(state): State<AppState>) -> ApiResult<Json<TraversalResult>> {
    match state.store.fetch_latest() {
        Ok(Some(result)) => Ok(Json(result)),
        Ok(None) => Err(ApiError::NotFound(
            "no traversal result stored".to_string(),
        )),
        Err(e) => Err(ApiError::Internal(format!("result store read failed: {e}"))),
    }
}

/// DELETE /traversal/latest
pub async fn clear_latest(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .store
        .clear()
        .map_err(|e| ApiError::Internal(format!("result store clear failed: {e}")))?;
    Ok(Json(serde_json::json!({"cleared": true})))
}

/// GET /traversal/active
pub async fn list_active_runs(State(state): State<AppState>) -> Json<Vec<ActiveRun>> {
    let runs = state.active_runs.read().await;
    let mut active: Vec<ActiveRun> = runs
        .iter()
        .map(|(run_id, handle)| ActiveRun {
            run_id: *run_id,
            started_at: handle.started_at,
        })
        .collect();
    active.sort_by_key(|run| run.started_at);
    Json(active)
}

/// POST /traversal/cancel/{run_id}
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let runs = state.active_runs.read().await;
    let handle = runs
        .get(&run_id)
        .ok_or_else(|| ApiError::NotFound(format!("no active traversal run: {run_id}")))?;

    handle.token.cancel();
    tracing::info!(run_id = %run_id, "Traversal run cancellation requested");

    Ok(Json(serde_json::json!({
        "runId": run_id,
        "cancelled": true,
    })))
}

/// Build traversal routes
pub fn traversal_routes() -> Router<AppState> {
    Router::new()
        .route("/traversal/start", post(start_traversal))
        .route(
            "/traversal/latest",
            get(latest_result).delete(clear_latest),
        )
        .route("/traversal/active", get(list_active_runs))
        .route("/traversal/cancel/:run_id", post(cancel_run))
}
