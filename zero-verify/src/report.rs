//! Result aggregation.
//!
//! A [`Report`] owns every [`CheckResult`] of a run in engine order plus the
//! summaries derived from them. It carries no timestamp, so identical inputs
//! give byte-identical reports.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::checks::{CheckCategory, CheckResult, CheckStatus, Severity};
use crate::model::ModelMetadata;

/// Overall verdict, worst finding wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Clean,
    Warnings,
    ErrorsFound,
    Critical,
}

impl Health {
    /// CLI exit status: 2 on critical findings, 1 on error findings.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Critical => 2,
            Self::ErrorsFound => 1,
            Self::Clean | Self::Warnings => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "CLEAN",
            Self::Warnings => "WARNINGS",
            Self::ErrorsFound => "ERRORS_FOUND",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Counts for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub total: usize,
    pub passed: usize,
    /// Findings: failed, missing input or internal error.
    pub failed: usize,
    pub not_applicable: usize,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub findings: usize,
    pub not_applicable: usize,
    /// `passed / (total - not_applicable)`, zero when nothing applied.
    pub pass_rate: f64,
    pub health: Health,
    /// Findings per severity. Every severity is present.
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_category: BTreeMap<CheckCategory, CategorySummary>,
}

/// One matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub status: CheckStatus,
    pub severity: Severity,
}

/// One check across every period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub check_id: &'static str,
    pub check_name: &'static str,
    /// Aligned with [`Matrix::periods`]; `None` where the check did not run.
    pub cells: Vec<Option<Cell>>,
}

/// Period by check grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Matrix {
    pub periods: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl Matrix {
    fn build(results: &[CheckResult]) -> Self {
        let mut periods: Vec<String> = Vec::new();
        for result in results {
            if !periods.contains(&result.period) {
                periods.push(result.period.clone());
            }
        }

        let mut rows: Vec<MatrixRow> = Vec::new();
        for result in results {
            let row = match rows.iter_mut().position(|r| r.check_id == result.check_id) {
                Some(i) => &mut rows[i],
                None => {
                    rows.push(MatrixRow {
                        check_id: result.check_id,
                        check_name: result.check_name,
                        cells: vec![None; periods.len()],
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            if let Some(col) = periods.iter().position(|p| *p == result.period) {
                row.cells[col] = Some(Cell {
                    status: result.status,
                    severity: result.severity,
                });
            }
        }
        Self { periods, rows }
    }

    pub fn cell(&self, check_id: &str, period: &str) -> Option<Cell> {
        let col = self.periods.iter().position(|p| p == period)?;
        let row = self.rows.iter().find(|r| r.check_id == check_id)?;
        row.cells[col]
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: ModelMetadata,
    pub summary: Summary,
    pub matrix: Matrix,
    pub results: Vec<CheckResult>,
}

fn rate(passed: usize, applicable: usize) -> f64 {
    if applicable == 0 {
        0.0
    } else {
        passed as f64 / applicable as f64
    }
}

/// Aggregate engine results into a report.
pub fn aggregate(results: Vec<CheckResult>) -> Report {
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut by_category: BTreeMap<CheckCategory, CategorySummary> = BTreeMap::new();
    let (mut passed, mut findings, mut not_applicable) = (0, 0, 0);

    for result in &results {
        let category = by_category.entry(result.category).or_default();
        category.total += 1;
        match result.status {
            CheckStatus::Passed => {
                passed += 1;
                category.passed += 1;
            }
            CheckStatus::NotApplicable => {
                not_applicable += 1;
                category.not_applicable += 1;
            }
            _ => {
                findings += 1;
                category.failed += 1;
                *by_severity.entry(result.severity).or_default() += 1;
            }
        }
    }
    for category in by_category.values_mut() {
        category.pass_rate = rate(category.passed, category.total - category.not_applicable);
    }

    let health = if by_severity[&Severity::Critical] > 0 {
        Health::Critical
    } else if by_severity[&Severity::Error] > 0 {
        Health::ErrorsFound
    } else if by_severity[&Severity::Warning] > 0 {
        Health::Warnings
    } else {
        Health::Clean
    };

    let summary = Summary {
        total: results.len(),
        passed,
        findings,
        not_applicable,
        pass_rate: rate(passed, results.len() - not_applicable),
        health,
        by_severity,
        by_category,
    };
    Report {
        metadata: ModelMetadata::default(),
        summary,
        matrix: Matrix::build(&results),
        results,
    }
}

impl Report {
    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Findings at or above `min_severity`, in report order.
    pub fn failures(&self, min_severity: Severity) -> Vec<&CheckResult> {
        self.results
            .iter()
            .filter(|r| r.is_finding() && r.severity >= min_severity)
            .collect()
    }

    pub fn health(&self) -> Health {
        self.summary.health
    }

    pub fn result(&self, check_id: &str, period: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|r| r.check_id == check_id && r.period == period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &'static str, category: CheckCategory, period: &str, status: CheckStatus, severity: Severity) -> CheckResult {
        CheckResult {
            check_id: id,
            check_name: id,
            category,
            period: period.to_string(),
            severity,
            status,
            passed: status == CheckStatus::Passed,
            message: String::new(),
            observed_value: None,
            expected_value: None,
            delta: None,
            relative_delta: None,
        }
    }

    fn sample() -> Vec<CheckResult> {
        use CheckCategory::*;
        use CheckStatus::*;
        vec![
            result("STR-001", Structural, "2023", Passed, Severity::Info),
            result("STR-001", Structural, "2024", Failed, Severity::Critical),
            result("XST-004", CrossStatement, "2023", NotApplicable, Severity::Info),
            result("XST-004", CrossStatement, "2024", Passed, Severity::Info),
            result("RSN-002", Reasonableness, "2023", NotApplicable, Severity::Info),
            result("RSN-002", Reasonableness, "2024", Failed, Severity::Warning),
            result("RSN-006", Reasonableness, "2023", MissingInput, Severity::Error),
            result("RSN-006", Reasonableness, "2024", Passed, Severity::Info),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let report = aggregate(sample());
        let s = &report.summary;
        assert_eq!(s.total, 8);
        assert_eq!(s.passed, 3);
        assert_eq!(s.findings, 3);
        assert_eq!(s.not_applicable, 2);
        assert!((s.pass_rate - 0.5).abs() < 1e-12);
        assert_eq!(s.by_severity[&Severity::Critical], 1);
        assert_eq!(s.by_severity[&Severity::Error], 1);
        assert_eq!(s.by_severity[&Severity::Warning], 1);
        assert_eq!(s.by_severity[&Severity::Info], 0);
        assert_eq!(s.health, Health::Critical);
    }

    #[test]
    fn test_category_summary() {
        let report = aggregate(sample());
        let rsn = &report.summary.by_category[&CheckCategory::Reasonableness];
        assert_eq!((rsn.total, rsn.passed, rsn.failed, rsn.not_applicable), (4, 1, 2, 1));
        assert!((rsn.pass_rate - 1.0 / 3.0).abs() < 1e-12);
        let xst = &report.summary.by_category[&CheckCategory::CrossStatement];
        assert_eq!(xst.pass_rate, 1.0);
    }

    #[test]
    fn test_health_levels() {
        let mut results = sample();
        results.retain(|r| r.severity != Severity::Critical);
        assert_eq!(aggregate(results.clone()).health(), Health::ErrorsFound);
        results.retain(|r| r.severity != Severity::Error);
        assert_eq!(aggregate(results.clone()).health(), Health::Warnings);
        results.retain(|r| r.severity != Severity::Warning);
        assert_eq!(aggregate(results).health(), Health::Clean);
        assert_eq!(Health::Critical.exit_code(), 2);
        assert_eq!(Health::Warnings.exit_code(), 0);
    }

    #[test]
    fn test_failures_view() {
        let report = aggregate(sample());
        let ids: Vec<_> = report
            .failures(Severity::Error)
            .iter()
            .map(|r| r.check_id)
            .collect();
        assert_eq!(ids, vec!["STR-001", "RSN-006"]);
        assert_eq!(report.failures(Severity::Info).len(), 3);
    }

    #[test]
    fn test_matrix() {
        let report = aggregate(sample());
        assert_eq!(report.matrix.periods, vec!["2023", "2024"]);
        assert_eq!(report.matrix.rows.len(), 4);
        let cell = report.matrix.cell("STR-001", "2024").unwrap();
        assert_eq!(cell.status, CheckStatus::Failed);
        assert!(report.matrix.cell("STR-001", "2025").is_none());
    }

    #[test]
    fn test_empty_results() {
        let report = aggregate(Vec::new());
        assert_eq!(report.summary.pass_rate, 0.0);
        assert_eq!(report.health(), Health::Clean);
        assert_eq!(report.summary.by_severity.len(), 4);
    }

    #[test]
    fn test_report_serializes_without_timestamp() {
        let json = serde_json::to_value(aggregate(sample())).unwrap();
        assert_eq!(json["summary"]["health"], "critical");
        assert_eq!(json["summary"]["by_severity"]["warning"], 1);
        assert!(json.get("generated_at").is_none());
    }
}
