//! lexnav-engine - Statute Relevance Navigation Service
//!
//! Loads the statute document, normalises and validates it once at
//! startup, then serves traversal requests over HTTP. Each request walks
//! the tree breadth-first under the relevance oracle and returns the
//! relevant sections with a complete decision trace.

use anyhow::{Context, Result};
use lexnav_engine::config::EngineSettings;
use lexnav_engine::models::DocumentTree;
use lexnav_engine::services::{document_normalizer, tree_validator, HttpOracle, ResultStore};
use lexnav_engine::{build_router, AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = EngineSettings::resolve().context("configuration resolution failed")?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(settings.log_level.clone()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting lexnav-engine (Statute Relevance Navigation)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Cache folder: {}", settings.cache_folder.display());
    info!("Document: {}", settings.document_path.display());

    lexnav_common::config::ensure_folder_exists(&settings.cache_folder)
        .context("cache folder initialisation failed")?;

    let tree = load_document(&settings)?;
    info!(
        nodes = tree.len(),
        roots = tree.root_nodes.len(),
        "Statute document loaded and validated"
    );

    let oracle = Arc::new(HttpOracle::new(&settings.oracle).context("oracle client init failed")?);
    let store = Arc::new(ResultStore::new(&settings.cache_folder));
    info!("Result store: {}", store.path().display());

    let bind_address = settings.bind_address.clone();
    let state = AppState::new(Arc::new(settings), Arc::new(tree), oracle, store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("Listening on http://{bind_address}");
    info!("Health check: http://{bind_address}/health");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Read, normalise and validate the statute document.
fn load_document(settings: &EngineSettings) -> Result<DocumentTree> {
    let raw_text = std::fs::read_to_string(&settings.document_path).with_context(|| {
        format!(
            "failed to read statute document at {}",
            settings.document_path.display()
        )
    })?;
    let raw: serde_json::Value =
        serde_json::from_str(&raw_text).context("statute document is not valid JSON")?;

    let tree = document_normalizer::normalize(&raw).context("statute document normalisation failed")?;
    tree_validator::validate(&tree).context("statute document failed validation")?;
    Ok(tree)
}
