//! Configuration loading and cache folder resolution
//!
//! Every setting resolves with the same priority order:
//! 1. Environment variable (`LEXNAV_*`)
//! 2. TOML config file (`~/.config/lexnav/<module>.toml`)
//! 3. OS-dependent compiled default
//!
//! Missing config files never abort startup: resolution falls through to
//! the compiled defaults with a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Oracle endpoint configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleToml {
    /// Base URL of an OpenAI-compatible chat completions endpoint
    pub base_url: Option<String>,
    /// API key (prefer `LEXNAV_ORACLE_API_KEY` over committing this to disk)
    pub api_key: Option<String>,
    /// Model identifier passed through to the oracle
    pub model: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

/// Traversal tuning configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraversalToml {
    /// Maximum traversal depth
    pub max_depth: Option<usize>,
    /// Relevance inclusion threshold in [0, 1]
    pub relevance_threshold: Option<f64>,
}

/// TOML configuration file schema
///
/// All fields optional so a partial (or missing) file still parses; missing
/// fields fall through to environment variables and compiled defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP bind address (e.g. "127.0.0.1:5810")
    pub bind_address: Option<String>,
    /// Folder holding the persisted latest-result slot
    pub cache_folder: Option<PathBuf>,
    /// Path to the raw statute document JSON
    pub document_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub oracle: OracleToml,
    pub traversal: TraversalToml,
}

/// Compiled per-platform defaults, used when neither environment nor TOML
/// provide a value.
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub cache_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            bind_address: "127.0.0.1:5810".to_string(),
            cache_folder: default_cache_folder(),
            log_level: "info".to_string(),
        }
    }
}

/// OS-dependent default cache folder
fn default_cache_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/lexnav
        dirs::data_local_dir()
            .map(|d| d.join("lexnav"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/lexnav"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/lexnav
        dirs::data_dir()
            .map(|d| d.join("lexnav"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lexnav"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\lexnav
        dirs::data_local_dir()
            .map(|d| d.join("lexnav"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lexnav"))
    } else {
        PathBuf::from("./lexnav_data")
    }
}

/// Config file path for a module (`~/.config/lexnav/<module>.toml` on Linux
/// and macOS, `%APPDATA%\lexnav\<module>.toml` on Windows).
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lexnav").join(format!("{module_name}.toml")))
}

/// Load the TOML config for a module.
///
/// A missing or unreadable file yields defaults with a warning; a present
/// but unparseable file is a hard error (silently ignoring a corrupt config
/// hides operator mistakes).
pub fn load_toml_config(module_name: &str) -> Result<TomlConfig> {
    let Some(path) = config_file_path(module_name) else {
        warn!("Could not determine config directory, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write a TOML config atomically (temp file + rename).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Resolve the cache folder: `LEXNAV_CACHE_FOLDER` → TOML → compiled default.
pub fn resolve_cache_folder(toml_config: &TomlConfig) -> PathBuf {
    if let Ok(path) = std::env::var("LEXNAV_CACHE_FOLDER") {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.cache_folder {
        return path.clone();
    }

    CompiledDefaults::for_current_platform().cache_folder
}

/// Resolve the bind address: `LEXNAV_BIND_ADDRESS` → TOML → compiled default.
pub fn resolve_bind_address(toml_config: &TomlConfig) -> String {
    if let Ok(addr) = std::env::var("LEXNAV_BIND_ADDRESS") {
        return addr;
    }

    if let Some(addr) = &toml_config.bind_address {
        return addr.clone();
    }

    CompiledDefaults::for_current_platform().bind_address
}

/// Resolve the log level: `LEXNAV_LOG_LEVEL` → TOML → "info".
pub fn resolve_log_level(toml_config: &TomlConfig) -> String {
    if let Ok(level) = std::env::var("LEXNAV_LOG_LEVEL") {
        return level;
    }

    toml_config.logging.level.clone()
}

/// Ensure a folder exists, creating it (and parents) if necessary.
pub fn ensure_folder_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "Not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_config_defaults_on_empty_input() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.oracle.base_url.is_none());
    }

    #[test]
    fn compiled_defaults_nonempty() {
        let defaults = CompiledDefaults::for_current_platform();
        assert!(!defaults.cache_folder.as_os_str().is_empty());
        assert_eq!(defaults.log_level, "info");
        assert!(defaults.bind_address.contains(':'));
    }
}
