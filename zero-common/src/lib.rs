//! Zero Common - Shared types and utilities for the Zero verification tools.
//!
//! This crate provides:
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers
//! - Configuration file helpers (config directory, layered JSON loading)
//! - Configuration validation primitives

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{config_dir, ObservabilityConfig};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::ObservabilityConfig;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging_with_exclusions;
    pub use crate::validation::{Validate, ValidationError};
}
