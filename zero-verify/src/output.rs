//! Console rendering and JSON export.
//!
//! Renderers return strings so the binary decides where they go.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use crate::checks::{registry, CheckResult, Severity};
use crate::error::Result;
use crate::mapping::{MappingDiagnostics, MatchTier};
use crate::report::{Health, Report};

const RULE: &str = "======================================================================";

fn health_icon(health: Health) -> &'static str {
    match health {
        Health::Clean => "✅",
        Health::Warnings => "🟡",
        Health::ErrorsFound => "🟠",
        Health::Critical => "🔴",
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::Error => "🟠",
        Severity::Warning => "🟡",
        Severity::Info => "🔵",
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn failure_line(out: &mut String, r: &CheckResult) {
    let _ = writeln!(
        out,
        "    {} [{}] {} {}: {}",
        severity_icon(r.severity),
        r.check_id,
        r.severity,
        r.period,
        r.message
    );
}

/// Summary block followed by findings at or above `min_severity`, worst
/// first.
pub fn render_summary(report: &Report, min_severity: Severity) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "  FINANCIAL MODEL VERIFICATION REPORT");
    if let Some(company) = &report.metadata.company_name {
        let _ = writeln!(out, "  Company:  {company}");
    }
    if let (Some(currency), unit) = (&report.metadata.currency, &report.metadata.unit) {
        let unit = unit.as_deref().map(|u| format!(" ({u})")).unwrap_or_default();
        let _ = writeln!(out, "  Currency: {currency}{unit}");
    }
    let _ = writeln!(out, "  Periods:  {}", report.matrix.periods.join(", "));
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  Overall Health: {} {}",
        health_icon(s.health),
        s.health.as_str()
    );
    let _ = writeln!(
        out,
        "  Results: {}  |  Passed: {}  |  Findings: {}  |  N/A: {}  |  Pass Rate: {}",
        s.total,
        s.passed,
        s.findings,
        s.not_applicable,
        percent(s.pass_rate)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  By Severity:");
    for severity in Severity::ALL.iter().rev() {
        let count = s.by_severity.get(severity).copied().unwrap_or(0);
        if count > 0 {
            let _ = writeln!(out, "    {} {:9} {count}", severity_icon(*severity), severity.as_str());
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  By Category:");
    for (category, stats) in &s.by_category {
        let _ = writeln!(
            out,
            "    {:16} {}/{} passed ({}), {} n/a",
            category.as_str(),
            stats.passed,
            stats.total - stats.not_applicable,
            percent(stats.pass_rate),
            stats.not_applicable
        );
    }

    let mut failures = report.failures(min_severity);
    if !failures.is_empty() {
        // Stable: report order within a severity.
        failures.sort_by(|a, b| b.severity.cmp(&a.severity));
        let _ = writeln!(out);
        let _ = writeln!(out, "  Findings ({}):", failures.len());
        for r in failures {
            failure_line(&mut out, r);
        }
    }
    out
}

/// Per-field mapping table.
pub fn render_diagnostics(diagnostics: &MappingDiagnostics) -> String {
    let mut out = String::new();
    for statement in &diagnostics.statements {
        let _ = writeln!(
            out,
            "{} ({} fields: {} exact, {} alias, {} fuzzy, {} unmapped)",
            statement.statement.title(),
            statement.fields.len(),
            statement.count(MatchTier::Exact),
            statement.count(MatchTier::Alias),
            statement.count(MatchTier::Fuzzy),
            statement.count(MatchTier::Unmapped),
        );
        for field in &statement.fields {
            let target = field
                .canonical_key
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(
                out,
                "  {:32} -> {:32} {:8} {:.2}",
                field.raw_name,
                target,
                field.match_tier.to_string(),
                field.confidence
            );
            if let Some(note) = &field.note {
                let _ = write!(out, "  ({note})");
            } else if !field.is_mapped() {
                if let Some(best) = field.candidates.first() {
                    let _ = write!(out, "  (closest: {} {:.2})", best.key, best.score);
                }
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
    }
    if !diagnostics.sign_adjustments.is_empty() {
        let _ = writeln!(out, "Sign adjustments:");
        for adj in &diagnostics.sign_adjustments {
            let _ = writeln!(out, "  {} {}: {} -> {}", adj.period, adj.key, adj.original, -adj.original);
        }
    }
    out
}

/// The check registry as a table.
pub fn render_checks() -> String {
    let mut out = String::new();
    for def in registry() {
        let _ = writeln!(
            out,
            "{}  {:16} {:9} {:32} {}",
            def.id,
            def.category.as_str(),
            def.severity_default.as_str(),
            def.name,
            def.description
        );
    }
    out
}

/// JSON export envelope. The timestamp lives here, not in the report.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub report: &'a Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<&'a MappingDiagnostics>,
}

impl<'a> Envelope<'a> {
    pub fn new(report: &'a Report, mapping: Option<&'a MappingDiagnostics>) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            report,
            mapping,
        }
    }
}

pub fn to_json(report: &Report, mapping: Option<&MappingDiagnostics>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Envelope::new(report, mapping))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{run, RunOptions};
    use crate::mapping::FieldMapper;
    use crate::model::{FinancialModel, LineItem as L, ModelMetadata, Period, RawModel};
    use crate::report::aggregate;

    fn report() -> Report {
        let period = Period::new("FY2024")
            .with(L::TotalAssets, 1010.0)
            .with(L::TotalLiabilities, 600.0)
            .with(L::TotalEquity, 400.0);
        let metadata = ModelMetadata {
            company_name: Some("Acme".into()),
            currency: Some("USD".into()),
            unit: Some("millions".into()),
        };
        let model = FinancialModel::new(metadata.clone(), vec![period]).unwrap();
        let results = run(&model, None, &RunOptions::default()).unwrap();
        aggregate(results).with_metadata(metadata)
    }

    #[test]
    fn test_summary_lists_critical_finding() {
        let text = render_summary(&report(), Severity::Warning);
        assert!(text.contains("Company:  Acme"));
        assert!(text.contains("Currency: USD (millions)"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("[STR-001] critical FY2024"));
    }

    #[test]
    fn test_findings_sorted_worst_first() {
        let text = render_summary(&report(), Severity::Info);
        let critical = text.find("[STR-001]").unwrap();
        let first_error = text.find(" error FY2024").unwrap();
        assert!(critical < first_error);
    }

    #[test]
    fn test_diagnostics_table() {
        let mut raw = RawModel::default();
        raw.income_statement.insert("Net Sales", "2024", 10.0);
        raw.income_statement.insert("Widgets", "2024", 1.0);
        let diagnostics = FieldMapper::default().diagnose(&raw);
        let text = render_diagnostics(&diagnostics);
        assert!(text.contains("Income Statement (2 fields: 0 exact, 1 alias, 0 fuzzy, 1 unmapped)"));
        assert!(text.contains("-> revenue"));
    }

    #[test]
    fn test_checks_table_has_every_check() {
        assert_eq!(render_checks().lines().count(), 32);
    }

    #[test]
    fn test_envelope_carries_timestamp() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&report(), None).unwrap()).unwrap();
        assert_eq!(json["tool"], "zero-verify");
        assert!(json["generated_at"].is_string());
        assert_eq!(json["report"]["summary"]["health"], "critical");
        assert!(json.get("mapping").is_none());
    }
}
