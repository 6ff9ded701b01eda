//! Error types for model verification.

use thiserror::Error;
use zero_common::ValidationError;

/// Result type alias for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Fatal errors: bad input data or bad configuration.
///
/// Problems found *inside* a model (identity mismatches, missing line items,
/// implausible ratios) are never errors; they become check results.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The raw model is unusable: empty, duplicated or unknown periods,
    /// non-finite values, unparseable numbers or period labels.
    #[error("Invalid model input: {0}")]
    Input(String),

    /// Tolerances, thresholds, alias mapping or check filter are invalid.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// File or parse failure from the shared plumbing.
    #[error(transparent)]
    Common(#[from] zero_common::Error),
}

impl VerifyError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 65,
            Self::Config(_) => 78,
            Self::Common(err) => err.exit_code(),
        }
    }
}

impl From<serde_json::Error> for VerifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Common(err.into())
    }
}

impl From<serde_yaml::Error> for VerifyError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Common(err.into())
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(err: std::io::Error) -> Self {
        Self::Common(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(VerifyError::input("empty").exit_code(), 65);
        assert_eq!(
            VerifyError::from(ValidationError::invalid("tolerance.absolute", "negative"))
                .exit_code(),
            78
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(VerifyError::from(io).exit_code(), 66);
    }

    #[test]
    fn test_config_message() {
        let err = VerifyError::from(ValidationError::invalid("fuzzy_threshold", "must be in (0, 1]"));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Invalid value for fuzzy_threshold: must be in (0, 1]"
        );
    }
}
