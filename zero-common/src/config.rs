//! Configuration file helpers shared by the Zero verification tools.
//!
//! Configuration lives under `~/.zero-verify/`:
//! - `config.json` - Core configuration (observability, verification settings)
//! - `mapping.yaml` - Optional user field-mapping extensions
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".zero-verify";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(CONFIG_DIR_NAME),
        |dirs| dirs.home_dir().join(CONFIG_DIR_NAME),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => directories::UserDirs::new()
            .map_or_else(|| path.to_path_buf(), |dirs| dirs.home_dir().join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Aliases: "level" for config files written by hand
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to exclude from logging.
    ///
    /// These modules are set to `warn` on top of the built-in noisy list.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Apply `ZERO_LOG_LEVEL` / `ZERO_LOG_FORMAT` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_lowercase();
            }
        }
        if let Ok(format) = std::env::var("ZERO_LOG_FORMAT") {
            if !format.trim().is_empty() {
                self.log_format = format.trim().to_lowercase();
            }
        }
    }
}

// ============================================================================
// File Loading
// ============================================================================

/// Load a JSON file and return its contents as a Value.
/// Returns None if file doesn't exist.
pub fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
pub fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => merge_json(target_value, source_value),
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Load several JSON files in order and deep-merge them.
///
/// Missing files are skipped; later files override earlier ones. Returns an
/// empty object when none of the files exist.
pub fn load_layered(paths: &[PathBuf]) -> Result<Value> {
    let mut merged = Value::Object(serde_json::Map::new());
    for path in paths {
        if let Some(value) = load_json_file(path)? {
            tracing::debug!(path = %path.display(), "Merging config layer");
            merge_json(&mut merged, value);
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_config_dir_name() {
        assert!(config_dir().ends_with(CONFIG_DIR_NAME));
        assert!(config_path().ends_with("config.json"));
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/etc/aliases.yaml");
        assert_eq!(expand_home(plain), plain);
        let expanded = expand_home(Path::new("~/mapping.yaml"));
        assert!(expanded.ends_with("mapping.yaml"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn test_observability_aliases() {
        let config: ObservabilityConfig =
            serde_json::from_value(json!({"level": "debug", "format": "json"})).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, "json");
        assert!(config.excluded_targets.is_empty());
    }

    #[test]
    fn test_merge_json_nested() {
        let mut target = json!({
            "observability": {"log_level": "info", "log_format": "pretty"},
            "verification": {"tolerance": {"absolute": 0.5}}
        });
        merge_json(
            &mut target,
            json!({
                "observability": {"log_level": "debug"},
                "verification": {"tolerance": {"relative": 0.01}}
            }),
        );
        assert_eq!(target["observability"]["log_level"], "debug");
        assert_eq!(target["observability"]["log_format"], "pretty");
        assert_eq!(target["verification"]["tolerance"]["absolute"], 0.5);
        assert_eq!(target["verification"]["tolerance"]["relative"], 0.01);
    }

    #[test]
    fn test_merge_json_replaces_scalars_and_arrays() {
        let mut target = json!({"disabled_checks": ["RSN-001"], "x": 1});
        merge_json(&mut target, json!({"disabled_checks": ["RSN-002"], "x": {"y": 2}}));
        assert_eq!(target["disabled_checks"], json!(["RSN-002"]));
        assert_eq!(target["x"]["y"], 2);
    }

    #[test]
    fn test_load_json_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_json_file(&dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_json_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_load_layered_override_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        let local = dir.path().join("local.json");
        fs::write(&base, r#"{"a": 1, "b": {"c": 2}}"#).unwrap();
        fs::write(&local, r#"{"b": {"c": 3}}"#).unwrap();

        let merged =
            load_layered(&[base, dir.path().join("missing.json"), local]).unwrap();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 3}}));
    }
}
