//! Logging utilities for the Zero verification tools.
//!
//! Provides structured JSON or human-readable logging, with a per-run ID for
//! correlating the log lines of one verification run.
//!
//! # Noise Filtering
//!
//! Library modules that log on every call (the rayon thread pool, YAML and
//! regex internals) are set to `warn` so that verification logs stay readable
//! at `debug`.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default noisy modules that should be filtered to warn level.
pub const NOISY_MODULES: &[&str] = &["rayon", "rayon_core", "serde_yaml", "regex"];

/// Log formats understood by [`init_logging_with_exclusions`].
pub const LOG_FORMATS: &[&str] = &["json", "pretty"];

/// Log levels understood by [`init_logging_with_exclusions`].
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Build the filter directive string with noise suppression.
fn build_directives(log_level: &str, excluded_targets: &[String]) -> String {
    let mut directives = String::from(log_level);

    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }

    for target in excluded_targets {
        directives.push_str(&format!(",{}=warn", target));
    }

    directives
}

/// Build the default EnvFilter with noise suppression.
///
/// `RUST_LOG` wins over the configured level when it is set.
fn build_filter(log_level: &str, excluded_targets: &[String]) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(build_directives(log_level, excluded_targets))
}

/// Initialize logging with the given configuration.
///
/// # Arguments
///
/// * `log_level` - Base log level (trace, debug, info, warn, error)
/// * `log_format` - Output format: "json" for structured JSON, "pretty" for human-readable
/// * `excluded_targets` - Extra modules held at `warn` on top of [`NOISY_MODULES`]
///
/// Logs go to stderr so that report output on stdout stays machine-readable.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging_with_exclusions(
    log_level: &str,
    log_format: &str,
    excluded_targets: &[String],
) {
    let filter = build_filter(log_level, excluded_targets);
    let subscriber = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::debug!(
        log_level = %log_level,
        log_format = %log_format,
        noise_filtered = NOISY_MODULES.len() + excluded_targets.len(),
        "Logging initialized"
    );
}

/// Generate a new run ID for correlating the log lines of a verification run.
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noisy_modules_list() {
        assert!(NOISY_MODULES.contains(&"rayon"));
        assert!(NOISY_MODULES.contains(&"rayon_core"));
    }

    #[test]
    fn test_build_directives() {
        let directives = build_directives("debug", &["zero_verify::mapping".to_string()]);
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("rayon=warn"));
        assert!(directives.ends_with("zero_verify::mapping=warn"));
    }

    #[test]
    fn test_generate_run_id() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging_with_exclusions("info", "pretty", &[]);
        init_logging_with_exclusions("debug", "json", &["zero_verify::mapping".to_string()]);
    }
}
