//! Configuration validation primitives.
//!
//! Every configuration section implements [`Validate`]. Validation runs before
//! any work starts: a broken configuration is rejected instead of silently
//! falling back to defaults.

use thiserror::Error;

use crate::config::ObservabilityConfig;
use crate::logging::{LOG_FORMATS, LOG_LEVELS};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Shorthand for an [`ValidationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Fold a list of errors into a single result.
    ///
    /// Empty list is `Ok`, a single error is returned as-is, more than one
    /// becomes [`ValidationError::Multiple`].
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Number of leaf errors.
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Require a finite, non-negative number.
pub fn non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::invalid(
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(())
}

/// Require a finite number inside `[min, max]`.
pub fn within(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::invalid(
            field,
            format!("must be between {min} and {max} (got {value})"),
        ));
    }
    Ok(())
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", LOG_LEVELS.join(", ")),
            });
        }

        if !LOG_FORMATS.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", LOG_FORMATS.join(", ")),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_observability() {
        assert!(ObservabilityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let config = ObservabilityConfig {
            log_level: "loud".into(),
            ..ObservabilityConfig::default()
        };
        let result = config.validate();
        if let Err(ValidationError::InvalidValue { field, .. }) = result {
            assert_eq!(field, "observability.log_level");
        } else {
            panic!("expected InvalidValue, got {result:?}");
        }
    }

    #[test]
    fn test_invalid_log_format() {
        let config = ObservabilityConfig {
            log_format: "xml".into(),
            ..ObservabilityConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("x", 0.0).is_ok());
        assert!(non_negative("x", 1.5).is_ok());
        assert!(non_negative("x", -0.1).is_err());
        assert!(non_negative("x", f64::NAN).is_err());
        assert!(non_negative("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_within() {
        assert!(within("x", 0.5, 0.0, 1.0).is_ok());
        assert!(within("x", 1.0, 0.0, 1.0).is_ok());
        assert!(within("x", 1.01, 0.0, 1.0).is_err());
        assert!(within("x", f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_collect() {
        assert!(ValidationError::collect(vec![]).is_ok());

        let single = ValidationError::collect(vec![ValidationError::invalid("a", "bad")]);
        assert!(matches!(single, Err(ValidationError::InvalidValue { .. })));

        let many = ValidationError::collect(vec![
            ValidationError::invalid("a", "bad"),
            ValidationError::Conflict { reason: "b".into() },
        ]);
        match many {
            Err(err @ ValidationError::Multiple(_)) => assert_eq!(err.count(), 2),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }
}
