//! Verification engine.
//!
//! Runs every selected check against every period and emits exactly one
//! [`CheckResult`] per (check, period). Nothing a model contains can abort a
//! run: missing inputs, first-period exemptions, panics and non-finite
//! arithmetic all become results.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use zero_common::logging::generate_run_id;
use zero_common::{Validate, ValidationError, ValidationResult};

use crate::checks::{
    self, CheckCategory, CheckContext, CheckDefinition, CheckResult, CheckStatus, Outcome,
    ReasonablenessConfig, Severity,
};
use crate::error::Result;
use crate::mapping::MappingDiagnostics;
use crate::model::{FinancialModel, LineItem, Period};
use crate::tolerance::Tolerance;

// ============================================================================
// Run Options
// ============================================================================

/// Everything a run needs besides the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub tolerance: Tolerance,
    pub reasonableness: ReasonablenessConfig,
    /// Check ids to skip.
    pub disabled_checks: Vec<String>,
    /// Categories to run. Empty runs all of them.
    pub categories: Vec<CheckCategory>,
}

impl RunOptions {
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Selected checks, in reporting order.
    pub fn selected(&self) -> Vec<&'static CheckDefinition> {
        checks::registry()
            .iter()
            .filter(|def| self.categories.is_empty() || self.categories.contains(&def.category))
            .filter(|def| {
                !self
                    .disabled_checks
                    .iter()
                    .any(|id| id.trim().eq_ignore_ascii_case(def.id))
            })
            .collect()
    }
}

impl Validate for RunOptions {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.tolerance.validate() {
            errors.push(e);
        }
        if let Err(e) = self.reasonableness.validate() {
            errors.push(e);
        }
        for id in &self.disabled_checks {
            if checks::find(id).is_none() {
                errors.push(ValidationError::invalid(
                    "verification.disabled_checks",
                    format!("unknown check id '{id}'"),
                ));
            }
        }
        ValidationError::collect(errors)
    }
}

// ============================================================================
// Run
// ============================================================================

/// Run the selected checks over every period of `model`.
///
/// Results are ordered by category, then check id, then period. The only
/// errors are configuration errors, raised before any check runs.
pub fn run(
    model: &FinancialModel,
    diagnostics: Option<&MappingDiagnostics>,
    options: &RunOptions,
) -> Result<Vec<CheckResult>> {
    options.validate()?;

    let run_id = generate_run_id();
    let selected = options.selected();
    tracing::info!(
        run_id = %run_id,
        checks = selected.len(),
        periods = model.len(),
        "Starting verification"
    );

    let mut results = Vec::with_capacity(selected.len() * model.len());
    for &def in &selected {
        for index in 0..model.len() {
            let result = evaluate(def, model.periods(), index, diagnostics, options);
            tracing::debug!(
                check = result.check_id,
                period = %result.period,
                status = %result.status,
                severity = %result.severity,
                "Check evaluated"
            );
            results.push(result);
        }
    }

    let findings = results.iter().filter(|r| r.is_finding()).count();
    tracing::info!(
        run_id = %run_id,
        checks = selected.len(),
        periods = model.len(),
        results = results.len(),
        findings,
        "Verification complete"
    );
    Ok(results)
}

fn evaluate(
    def: &'static CheckDefinition,
    periods: &[Period],
    index: usize,
    diagnostics: Option<&MappingDiagnostics>,
    options: &RunOptions,
) -> CheckResult {
    let period = &periods[index];
    let prior = index.checked_sub(1).map(|i| &periods[i]);
    let base = |status: CheckStatus, severity: Severity, message: String| CheckResult {
        check_id: def.id,
        check_name: def.name,
        category: def.category,
        period: period.label.clone(),
        severity,
        status,
        passed: status == CheckStatus::Passed,
        message,
        observed_value: None,
        expected_value: None,
        delta: None,
        relative_delta: None,
    };

    let missing = missing_keys(def.required_keys, period);
    if !missing.is_empty() {
        let message = missing_message("missing input", &missing, diagnostics);
        return base(CheckStatus::MissingInput, Severity::Error, message);
    }

    if def.is_rollforward() {
        let Some(prior) = prior else {
            return base(
                CheckStatus::NotApplicable,
                Severity::Info,
                "first period has no prior period".to_string(),
            );
        };
        let missing = missing_keys(def.prior_keys, prior);
        if !missing.is_empty() {
            let context = format!("missing prior-period input ({})", prior.label);
            let message = missing_message(&context, &missing, diagnostics);
            return base(CheckStatus::MissingInput, Severity::Error, message);
        }
    }

    let ctx = CheckContext {
        period,
        prior,
        history: &periods[..=index],
        tolerance: options.tolerance,
        thresholds: &options.reasonableness,
    };

    let outcome = match isolate(|| def.kind.evaluate(&ctx)) {
        Ok(outcome) => outcome,
        Err(panic_message) => {
            tracing::warn!(check = def.id, period = %period.label, "Check panicked: {panic_message}");
            return base(
                CheckStatus::InternalError,
                Severity::Error,
                format!("check failed internally: {panic_message}"),
            );
        }
    };
    if !is_finite(&outcome) {
        tracing::warn!(check = def.id, period = %period.label, "Non-finite check arithmetic");
        return base(
            CheckStatus::InternalError,
            Severity::Error,
            format!("non-finite arithmetic result ({})", outcome.message),
        );
    }

    let severity = match outcome.status {
        CheckStatus::Failed => outcome.severity.unwrap_or(def.severity_default),
        _ => Severity::Info,
    };
    CheckResult {
        observed_value: outcome.observed,
        expected_value: outcome.expected,
        delta: outcome.delta,
        relative_delta: outcome.relative_delta,
        ..base(outcome.status, severity, outcome.message)
    }
}

/// Run a check, turning a panic into its message.
fn isolate<F: FnOnce() -> Outcome>(check: F) -> std::result::Result<Outcome, String> {
    panic::catch_unwind(AssertUnwindSafe(check)).map_err(|payload| {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    })
}

fn is_finite(outcome: &Outcome) -> bool {
    [outcome.observed, outcome.expected, outcome.delta, outcome.relative_delta]
        .into_iter()
        .flatten()
        .all(f64::is_finite)
}

fn missing_keys(keys: &[LineItem], period: &Period) -> Vec<LineItem> {
    keys.iter().copied().filter(|key| period.get(*key).is_none()).collect()
}

/// Lists the missing keys, pointing at the closest unmapped raw field when
/// the mapping diagnostics have one.
fn missing_message(
    context: &str,
    missing: &[LineItem],
    diagnostics: Option<&MappingDiagnostics>,
) -> String {
    let keys = missing
        .iter()
        .map(|item| format!("{}.{}", item.statement(), item))
        .collect::<Vec<_>>()
        .join(", ");
    let hints: Vec<String> = missing
        .iter()
        .filter_map(|item| closest_unmapped(diagnostics?, *item))
        .collect();
    if hints.is_empty() {
        format!("{context}: {keys}")
    } else {
        format!("{context}: {keys} ({})", hints.join("; "))
    }
}

fn closest_unmapped(diagnostics: &MappingDiagnostics, item: LineItem) -> Option<String> {
    diagnostics
        .statement(item.statement())?
        .unmapped()
        .filter_map(|field| {
            field
                .candidates
                .iter()
                .find(|c| c.key == item)
                .map(|c| (field.raw_name.as_str(), c.score))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(raw, score)| format!("unmapped field '{raw}' scored {score:.2} for {item}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldMapper, MappingConfig};
    use crate::model::{LineItem as L, ModelMetadata, RawModel, StatementKind};

    fn model(periods: Vec<Period>) -> FinancialModel {
        FinancialModel::new(ModelMetadata::default(), periods).unwrap()
    }

    fn result<'a>(results: &'a [CheckResult], id: &str, period: &str) -> &'a CheckResult {
        results
            .iter()
            .find(|r| r.check_id == id && r.period == period)
            .unwrap()
    }

    #[test]
    fn test_one_result_per_check_and_period() {
        let m = model(vec![Period::new("2023"), Period::new("2024")]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        assert_eq!(results.len(), 64);
        let ordered: Vec<_> = results
            .iter()
            .map(|r| (r.category, r.check_id, r.period.clone()))
            .collect();
        let mut sorted = ordered.clone();
        sorted.sort();
        assert_eq!(ordered, sorted);
    }

    #[test]
    fn test_missing_input_is_error_result() {
        let m = model(vec![Period::new("2024")
            .with(L::TotalAssets, 100.0)
            .with(L::TotalLiabilities, 60.0)]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        let r = result(&results, "STR-001", "2024");
        assert_eq!(r.status, CheckStatus::MissingInput);
        assert_eq!(r.severity, Severity::Error);
        assert!(!r.passed);
        assert_eq!(r.message, "missing input: balance_sheet.total_equity");
    }

    #[test]
    fn test_negative_cash_flagged_on_balance_sheet_only_model() {
        let m = model(vec![Period::new("2024")
            .with(L::Cash, -25.0)
            .with(L::TotalLiabilities, 60.0)
            .with(L::TotalEquity, 40.0)]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        let r = result(&results, "RSN-005", "2024");
        assert_eq!(r.status, CheckStatus::Failed);
        assert_eq!(r.severity, Severity::Warning);
        assert_eq!(r.observed_value, Some(-25.0));
    }

    #[test]
    fn test_first_period_exempt_from_rollforward() {
        let m = model(vec![
            Period::new("2023").with(L::EndingCash, 500.0).with(L::BeginningCash, 400.0),
            Period::new("2024").with(L::BeginningCash, 500.0),
        ]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        let first = result(&results, "XST-004", "2023");
        assert_eq!(first.status, CheckStatus::NotApplicable);
        assert_eq!(first.severity, Severity::Info);
        assert!(result(&results, "XST-004", "2024").passed);
    }

    #[test]
    fn test_missing_current_input_beats_first_period_exemption() {
        let m = model(vec![Period::new("2023")]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        assert_eq!(result(&results, "XST-004", "2023").status, CheckStatus::MissingInput);
    }

    #[test]
    fn test_missing_prior_input() {
        let m = model(vec![
            Period::new("2023"),
            Period::new("2024").with(L::BeginningCash, 500.0),
        ]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        let r = result(&results, "XST-004", "2024");
        assert_eq!(r.status, CheckStatus::MissingInput);
        assert!(r.message.contains("prior-period input (2023)"));
    }

    #[test]
    fn test_overflow_becomes_internal_error() {
        let m = model(vec![Period::new("2024")
            .with(L::TotalAssets, 1.0)
            .with(L::TotalLiabilities, f64::MAX)
            .with(L::TotalEquity, f64::MAX)]);
        let results = run(&m, None, &RunOptions::default()).unwrap();
        let r = result(&results, "STR-001", "2024");
        assert_eq!(r.status, CheckStatus::InternalError);
        assert_eq!(r.severity, Severity::Error);
    }

    #[test]
    fn test_isolate_catches_panic() {
        let caught = isolate(|| panic!("boom"));
        assert_eq!(caught.unwrap_err(), "boom");
        let ok = isolate(|| Outcome::not_applicable("fine"));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_filters() {
        let m = model(vec![Period::new("2024")]);
        let options = RunOptions {
            disabled_checks: vec!["str-001".into()],
            categories: vec![CheckCategory::Structural],
            ..RunOptions::default()
        };
        let results = run(&m, None, &options).unwrap();
        assert_eq!(results.len(), 14);
        assert!(results.iter().all(|r| r.category == CheckCategory::Structural));
        assert!(results.iter().all(|r| r.check_id != "STR-001"));
    }

    #[test]
    fn test_unknown_check_id_is_config_error() {
        let m = model(vec![Period::new("2024")]);
        let options = RunOptions {
            disabled_checks: vec!["STR-999".into()],
            ..RunOptions::default()
        };
        let err = run(&m, None, &options).unwrap_err();
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().contains("STR-999"));
    }

    #[test]
    fn test_invalid_tolerance_rejected_before_run() {
        let m = model(vec![Period::new("2024")]);
        let options = RunOptions::default().with_tolerance(Tolerance::new(-1.0, 0.0));
        assert!(run(&m, None, &options).is_err());
    }

    #[test]
    fn test_missing_input_points_at_unmapped_field() {
        let mut raw = RawModel::default();
        raw.balance_sheet.insert("Total Assets", "2024", 100.0);
        raw.balance_sheet.insert("Total Liabilities", "2024", 60.0);
        raw.balance_sheet.insert("Total Equty", "2024", 40.0);
        let mapper = FieldMapper::new(MappingConfig::empty().with_threshold(0.99));
        let (m, diagnostics) = mapper.build_model(&raw).unwrap();
        assert!(diagnostics.field(StatementKind::Balance, "Total Equty").is_some());

        let results = run(&m, Some(&diagnostics), &RunOptions::default()).unwrap();
        let r = result(&results, "STR-001", "2024");
        assert_eq!(r.status, CheckStatus::MissingInput);
        assert!(r.message.contains("unmapped field 'Total Equty'"), "{}", r.message);
    }
}
