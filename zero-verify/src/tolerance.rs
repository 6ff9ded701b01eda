//! Tolerance comparator shared by every check.
//!
//! Two values are equal when their gap is within the absolute tolerance or
//! within the relative tolerance scaled by `max(|observed|, |expected|, 1)`.
//! One policy applies to the whole run.

use serde::{Deserialize, Serialize};
use zero_common::validation::non_negative;
use zero_common::{Validate, ValidationError, ValidationResult};

pub const DEFAULT_ABSOLUTE_TOLERANCE: f64 = 0.5;
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 0.001;

/// Absolute and relative tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    #[serde(default = "default_absolute")]
    pub absolute: f64,
    #[serde(default = "default_relative")]
    pub relative: f64,
}

fn default_absolute() -> f64 {
    DEFAULT_ABSOLUTE_TOLERANCE
}

fn default_relative() -> f64 {
    DEFAULT_RELATIVE_TOLERANCE
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: DEFAULT_ABSOLUTE_TOLERANCE,
            relative: DEFAULT_RELATIVE_TOLERANCE,
        }
    }
}

/// Outcome of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub equal: bool,
    /// `|observed - expected|`
    pub delta: f64,
    /// `delta / max(|observed|, |expected|, 1)`
    pub relative_delta: f64,
}

impl Tolerance {
    pub fn new(absolute: f64, relative: f64) -> Self {
        Self { absolute, relative }
    }

    /// Compare two values. Symmetric in its arguments.
    pub fn compare(&self, observed: f64, expected: f64) -> Comparison {
        let delta = (observed - expected).abs();
        let scale = observed.abs().max(expected.abs()).max(1.0);
        let relative_delta = delta / scale;
        let equal = delta <= self.absolute || delta <= self.relative * scale;
        Comparison {
            equal,
            delta,
            relative_delta,
        }
    }

    pub fn is_equal(&self, observed: f64, expected: f64) -> bool {
        self.compare(observed, expected).equal
    }

    /// Below zero by more than the tolerance allows.
    pub fn is_negative(&self, value: f64) -> bool {
        value < 0.0 && !self.is_equal(value, 0.0)
    }
}

impl Validate for Tolerance {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = non_negative("verification.tolerance.absolute", self.absolute) {
            errors.push(e);
        }
        if let Err(e) = non_negative("verification.tolerance.relative", self.relative) {
            errors.push(e);
        }
        ValidationError::collect(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_identity_scenario() {
        let default = Tolerance::default();
        let cmp = default.compare(1000.3, 600.0 + 400.0);
        assert!(cmp.equal);

        let strict = Tolerance::new(0.1, 0.0);
        let cmp = strict.compare(1000.3, 1000.0);
        assert!(!cmp.equal);
        assert!((cmp.delta - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_relative_branch() {
        let tol = Tolerance::new(0.0, 0.001);
        // 0.1% of 1_000_000 is 1_000.
        assert!(tol.is_equal(1_000_000.0, 1_000_900.0));
        assert!(!tol.is_equal(1_000_000.0, 1_002_000.0));
        // Small magnitudes scale by 1, not by the values themselves.
        assert!(tol.is_equal(0.0, 0.0009));
    }

    #[test]
    fn test_relative_delta() {
        let cmp = Tolerance::default().compare(480.0, 500.0);
        assert_eq!(cmp.delta, 20.0);
        assert!((cmp.relative_delta - 0.04).abs() < 1e-12);
        let small = Tolerance::default().compare(0.2, 0.0);
        assert!((small.relative_delta - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_is_negative() {
        let tol = Tolerance::default();
        assert!(!tol.is_negative(-0.4));
        assert!(tol.is_negative(-0.6));
        assert!(!tol.is_negative(10.0));
    }

    #[test]
    fn test_validation() {
        assert!(Tolerance::default().validate().is_ok());
        assert!(Tolerance::new(0.0, 0.0).validate().is_ok());
        assert!(Tolerance::new(-0.1, 0.001).validate().is_err());
        assert!(Tolerance::new(0.5, f64::NAN).validate().is_err());
        let both = Tolerance::new(-1.0, f64::INFINITY).validate().unwrap_err();
        assert_eq!(both.count(), 2);
    }
}
