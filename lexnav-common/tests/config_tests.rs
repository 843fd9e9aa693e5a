//! Configuration resolution and graceful degradation tests
//!
//! Note: uses the serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate LEXNAV_* variables are marked #[serial] so they run
//! sequentially, not in parallel.

use lexnav_common::config::{
    ensure_folder_exists, resolve_bind_address, resolve_cache_folder, resolve_log_level,
    write_toml_config, CompiledDefaults, LoggingConfig, OracleToml, TomlConfig, TraversalToml,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.cache_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");

    #[cfg(target_os = "linux")]
    {
        let path_str = defaults.cache_folder.to_string_lossy();
        assert!(
            path_str.contains("lexnav"),
            "Linux default should live under a lexnav directory"
        );
    }
}

#[test]
#[serial]
fn test_cache_folder_resolution_default() {
    env::remove_var("LEXNAV_CACHE_FOLDER");

    let resolved = resolve_cache_folder(&TomlConfig::default());
    assert_eq!(resolved, CompiledDefaults::for_current_platform().cache_folder);
}

#[test]
#[serial]
fn test_cache_folder_env_var_takes_precedence() {
    env::set_var("LEXNAV_CACHE_FOLDER", "/tmp/lexnav-test-env-folder");

    let toml_config = TomlConfig {
        cache_folder: Some(PathBuf::from("/tmp/lexnav-from-toml")),
        ..TomlConfig::default()
    };
    let resolved = resolve_cache_folder(&toml_config);

    assert_eq!(resolved, PathBuf::from("/tmp/lexnav-test-env-folder"));

    env::remove_var("LEXNAV_CACHE_FOLDER");
}

#[test]
#[serial]
fn test_cache_folder_toml_beats_default() {
    env::remove_var("LEXNAV_CACHE_FOLDER");

    let toml_config = TomlConfig {
        cache_folder: Some(PathBuf::from("/tmp/lexnav-from-toml")),
        ..TomlConfig::default()
    };
    let resolved = resolve_cache_folder(&toml_config);

    assert_eq!(resolved, PathBuf::from("/tmp/lexnav-from-toml"));
}

#[test]
#[serial]
fn test_bind_address_resolution_priority() {
    env::remove_var("LEXNAV_BIND_ADDRESS");

    // Default when nothing configured
    let resolved = resolve_bind_address(&TomlConfig::default());
    assert_eq!(resolved, CompiledDefaults::for_current_platform().bind_address);

    // TOML beats default
    let toml_config = TomlConfig {
        bind_address: Some("0.0.0.0:9000".to_string()),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_bind_address(&toml_config), "0.0.0.0:9000");

    // ENV beats TOML
    env::set_var("LEXNAV_BIND_ADDRESS", "127.0.0.1:4444");
    assert_eq!(resolve_bind_address(&toml_config), "127.0.0.1:4444");
    env::remove_var("LEXNAV_BIND_ADDRESS");
}

#[test]
#[serial]
fn test_log_level_resolution() {
    env::remove_var("LEXNAV_LOG_LEVEL");

    assert_eq!(resolve_log_level(&TomlConfig::default()), "info");

    let toml_config = TomlConfig {
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        ..TomlConfig::default()
    };
    assert_eq!(resolve_log_level(&toml_config), "debug");

    env::set_var("LEXNAV_LOG_LEVEL", "trace");
    assert_eq!(resolve_log_level(&toml_config), "trace");
    env::remove_var("LEXNAV_LOG_LEVEL");
}

#[test]
fn test_ensure_folder_creates_nested_directories() {
    let base = tempfile::tempdir().unwrap();
    let nested = base.path().join("level1").join("level2");

    ensure_folder_exists(&nested).unwrap();
    assert!(nested.is_dir());

    // Idempotent
    ensure_folder_exists(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_ensure_folder_rejects_file() {
    let base = tempfile::tempdir().unwrap();
    let file_path = base.path().join("not-a-dir");
    std::fs::write(&file_path, "x").unwrap();

    assert!(ensure_folder_exists(&file_path).is_err());
}

#[test]
fn test_toml_roundtrip_with_oracle_section() {
    let config = TomlConfig {
        bind_address: Some("127.0.0.1:5810".to_string()),
        cache_folder: Some(PathBuf::from("/data/lexnav")),
        document_path: Some(PathBuf::from("/data/statute.json")),
        logging: LoggingConfig {
            level: "warn".to_string(),
        },
        oracle: OracleToml {
            base_url: Some("https://oracle.example.com/v1".to_string()),
            api_key: Some("test-key-123".to_string()),
            model: Some("relevance-v2".to_string()),
            timeout_seconds: Some(45),
        },
        traversal: TraversalToml {
            max_depth: Some(6),
            relevance_threshold: Some(0.65),
        },
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed: TomlConfig = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed, config);
}

#[test]
fn test_backward_compatible_missing_sections() {
    // Older config files without oracle/traversal tables still parse
    let toml_str = r#"
        bind_address = "127.0.0.1:5810"
        [logging]
        level = "info"
    "#;

    let config: TomlConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.bind_address, Some("127.0.0.1:5810".to_string()));
    assert_eq!(config.oracle, OracleToml::default());
    assert_eq!(config.traversal.max_depth, None);
}

#[test]
fn test_write_toml_config_atomic() {
    let base = tempfile::tempdir().unwrap();
    let path = base.path().join("engine.toml");

    let config = TomlConfig {
        bind_address: Some("127.0.0.1:5810".to_string()),
        ..TomlConfig::default()
    };

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    // No temp file left behind
    assert!(!path.with_extension("toml.tmp").exists());

    let parsed: TomlConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.bind_address, Some("127.0.0.1:5810".to_string()));

    // Overwrite is also atomic
    let config2 = TomlConfig {
        bind_address: Some("0.0.0.0:1234".to_string()),
        ..TomlConfig::default()
    };
    write_toml_config(&config2, &path).unwrap();
    let parsed2: TomlConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed2.bind_address, Some("0.0.0.0:1234".to_string()));
}
