//! Configuration resolution for lexnav-engine
//!
//! Settings resolve ENV → TOML → compiled default. The oracle API key is
//! the only required setting: the engine refuses to start without one
//! rather than failing on the first traversal.

use crate::services::oracle_client::{OracleSettings, DEFAULT_TIMEOUT_SECS};
use crate::services::traversal_driver::{DEFAULT_MAX_DEPTH, DEFAULT_RELEVANCE_THRESHOLD};
use lexnav_common::config::{
    load_toml_config, resolve_bind_address, resolve_cache_folder, resolve_log_level, TomlConfig,
};
use lexnav_common::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Config file name under the lexnav config directory.
pub const MODULE_NAME: &str = "engine";

const DEFAULT_ORACLE_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ORACLE_MODEL: &str = "gpt-4o-mini";
/// Statute file looked up inside the cache folder when not configured.
const DEFAULT_DOCUMENT_FILE: &str = "document.json";

/// Fully resolved engine settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub bind_address: String,
    pub cache_folder: PathBuf,
    pub document_path: PathBuf,
    pub log_level: String,
    pub oracle: OracleSettings,
    pub max_depth: usize,
    pub relevance_threshold: f64,
}

impl EngineSettings {
    /// Resolve all settings from environment, TOML and defaults.
    pub fn resolve() -> Result<Self> {
        let toml_config = load_toml_config(MODULE_NAME)?;

        let cache_folder = resolve_cache_folder(&toml_config);
        let bind_address = resolve_bind_address(&toml_config);
        let log_level = resolve_log_level(&toml_config);
        let document_path = resolve_document_path(&toml_config, &cache_folder);

        let api_key = resolve_oracle_api_key(&toml_config)?;
        let base_url = std::env::var("LEXNAV_ORACLE_BASE_URL")
            .ok()
            .or_else(|| toml_config.oracle.base_url.clone())
            .unwrap_or_else(|| DEFAULT_ORACLE_BASE_URL.to_string());
        let model = std::env::var("LEXNAV_ORACLE_MODEL")
            .ok()
            .or_else(|| toml_config.oracle.model.clone())
            .unwrap_or_else(|| DEFAULT_ORACLE_MODEL.to_string());
        let timeout = Duration::from_secs(
            toml_config
                .oracle
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let max_depth = toml_config.traversal.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        if max_depth == 0 {
            return Err(Error::Config("traversal.max_depth must be at least 1".to_string()));
        }
        let relevance_threshold = toml_config
            .traversal
            .relevance_threshold
            .unwrap_or(DEFAULT_RELEVANCE_THRESHOLD);
        if !(0.0..=1.0).contains(&relevance_threshold) {
            return Err(Error::Config(
                "traversal.relevance_threshold must be within [0, 1]".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            cache_folder,
            document_path,
            log_level,
            oracle: OracleSettings {
                base_url,
                api_key,
                model,
                timeout,
            },
            max_depth,
            relevance_threshold,
        })
    }
}

/// Resolve the statute document path:
/// `LEXNAV_DOCUMENT_PATH` → TOML → `<cache_folder>/document.json`.
fn resolve_document_path(toml_config: &TomlConfig, cache_folder: &std::path::Path) -> PathBuf {
    if let Ok(path) = std::env::var("LEXNAV_DOCUMENT_PATH") {
        return PathBuf::from(path);
    }
    if let Some(path) = &toml_config.document_path {
        return path.clone();
    }
    cache_folder.join(DEFAULT_DOCUMENT_FILE)
}

/// Resolve the oracle API key from ENV → TOML.
///
/// Warns when both sources carry a key (potential misconfiguration) and
/// uses the environment value.
pub fn resolve_oracle_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var("LEXNAV_ORACLE_API_KEY")
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_key = toml_config
        .oracle
        .api_key
        .as_ref()
        .filter(|key| is_valid_key(key));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Oracle API key found in both environment and TOML. \
             Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Oracle API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("Oracle API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(
        "Oracle API key not configured. Please configure using one of:\n\
         1. Environment: LEXNAV_ORACLE_API_KEY=your-key-here\n\
         2. TOML config: ~/.config/lexnav/engine.toml ([oracle] api_key = \"your-key\")"
            .to_string(),
    ))
}

/// Validate an API key (non-empty, non-whitespace).
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
