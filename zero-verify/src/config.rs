//! Verification configuration.
//!
//! Root configuration lives at `~/.zero-verify/config.json`:
//!
//! ```json
//! {
//!   "observability": { "log_level": "info", "log_format": "pretty" },
//!   "verification": {
//!     "tolerance": { "absolute": 0.5, "relative": 0.001 },
//!     "mapping_file": "~/.zero-verify/mapping.yaml",
//!     "reasonableness": { "max_capex_intensity": 0.4 },
//!     "disabled_checks": ["RSN-006"],
//!     "categories": ["structural", "cross_statement"]
//!   }
//! }
//! ```
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_LOG_LEVEL` / `ZERO_LOG_FORMAT` → observability
//! - `ZERO_VERIFY_ABS_TOLERANCE` → verification.tolerance.absolute
//! - `ZERO_VERIFY_REL_TOLERANCE` → verification.tolerance.relative
//! - `ZERO_VERIFY_MAPPING` → verification.mapping_file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zero_common::config::{config_dir, config_path, expand_home, load_layered};
use zero_common::{ObservabilityConfig, Validate, ValidationError, ValidationResult};

use crate::checks::{CheckCategory, ReasonablenessConfig};
use crate::engine::RunOptions;
use crate::mapping::{MappingConfig, MappingFile};
use crate::tolerance::Tolerance;

/// Default user mapping file, picked up when no other is configured.
pub const USER_MAPPING_FILE: &str = "mapping.yaml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
}

/// Verification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationConfig {
    #[serde(default)]
    pub tolerance: Tolerance,

    /// YAML alias file layered over the built-in aliases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,

    #[serde(default)]
    pub reasonableness: ReasonablenessConfig,

    #[serde(default)]
    pub disabled_checks: Vec<String>,

    /// Categories to run. Empty runs all of them.
    #[serde(default)]
    pub categories: Vec<CheckCategory>,
}

impl VerificationConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            tolerance: self.tolerance,
            reasonableness: self.reasonableness.clone(),
            disabled_checks: self.disabled_checks.clone(),
            categories: self.categories.clone(),
        }
    }

    /// Mapping file in effect: the configured one, else the user file if it
    /// exists.
    pub fn mapping_path(&self) -> Option<PathBuf> {
        match &self.mapping_file {
            Some(path) => Some(expand_home(path)),
            None => {
                let user = config_dir().join(USER_MAPPING_FILE);
                user.exists().then_some(user)
            }
        }
    }

    /// Built-in aliases extended with the mapping file in effect.
    pub fn mapping_config(&self) -> crate::Result<MappingConfig> {
        let mut config = MappingConfig::builtin();
        if let Some(path) = self.mapping_path() {
            tracing::debug!(path = %path.display(), "Loading mapping file");
            config.extend(&MappingFile::load(&path)?)?;
        }
        Ok(config)
    }
}

impl Config {
    /// Load `~/.zero-verify/config.json` (defaults when absent), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env_overrides()?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load one config file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let value = load_layered(&[path.to_path_buf()])?;
        let config: Self = serde_json::from_value(value)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.observability.apply_env_overrides();

        if let Some(value) = env_number("ZERO_VERIFY_ABS_TOLERANCE")? {
            self.verification.tolerance.absolute = value;
        }
        if let Some(value) = env_number("ZERO_VERIFY_REL_TOLERANCE")? {
            self.verification.tolerance.relative = value;
        }
        if let Ok(path) = std::env::var("ZERO_VERIFY_MAPPING") {
            if !path.trim().is_empty() {
                self.verification.mapping_file = Some(PathBuf::from(path.trim()));
            }
        }
        Ok(())
    }
}

fn env_number(name: &str) -> Result<Option<f64>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("{name} must be a number (got '{raw}')")),
        _ => Ok(None),
    }
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }
        if let Err(e) = self.verification.run_options().validate() {
            errors.push(e);
        }
        ValidationError::collect(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.verification.tolerance, Tolerance::default());
        assert_eq!(config.observability.log_level, "info");
        assert!(config.verification.disabled_checks.is_empty());
    }

    #[test]
    fn test_partial_file() {
        let file = write_config(
            r#"{
                "observability": { "level": "debug" },
                "verification": {
                    "tolerance": { "absolute": 1.0 },
                    "reasonableness": { "max_dso": 90 },
                    "disabled_checks": ["RSN-006"],
                    "categories": ["structural"]
                }
            }"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.verification.tolerance.absolute, 1.0);
        assert_eq!(config.verification.tolerance.relative, 0.001);
        assert_eq!(config.verification.reasonableness.max_dso, 90.0);

        let options = config.verification.run_options();
        assert_eq!(options.selected().len(), 15);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config(r#"{ "verification": { "tolerance": { "absolute": -1 } } }"#);
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("verification.tolerance.absolute"));

        let file = write_config(r#"{ "verification": { "disabled_checks": ["XYZ-1"] } }"#);
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown check id 'XYZ-1'"));

        let file = write_config(r#"{ "verification": { "reasonableness": { "max_foo": 1 } } }"#);
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("ZERO_VERIFY_REL_TOLERANCE", "0.01");
        std::env::set_var("ZERO_VERIFY_MAPPING", "/tmp/aliases.yaml");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        std::env::remove_var("ZERO_VERIFY_REL_TOLERANCE");
        std::env::remove_var("ZERO_VERIFY_MAPPING");

        assert_eq!(config.verification.tolerance.relative, 0.01);
        assert_eq!(
            config.verification.mapping_file,
            Some(PathBuf::from("/tmp/aliases.yaml"))
        );
    }

    #[test]
    fn test_bad_env_number() {
        std::env::set_var("ZERO_VERIFY_TEST_NUMBER", "half");
        let err = env_number("ZERO_VERIFY_TEST_NUMBER").unwrap_err();
        std::env::remove_var("ZERO_VERIFY_TEST_NUMBER");
        assert!(err.to_string().contains("ZERO_VERIFY_TEST_NUMBER must be a number"));
        assert_eq!(env_number("ZERO_VERIFY_TEST_UNSET").unwrap(), None);
    }

    #[test]
    fn test_mapping_file_extends_builtin() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"income_statement:\n  revenue:\n    aliases: [\"Top Line Sales\"]\n")
            .unwrap();
        let verification = VerificationConfig {
            mapping_file: Some(file.path().to_path_buf()),
            ..VerificationConfig::default()
        };
        let mapping = verification.mapping_config().unwrap();
        assert!(mapping.aliases(crate::model::LineItem::Revenue).iter().any(|a| a == "Top Line Sales"));
    }
}
