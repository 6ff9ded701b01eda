//! JSON ingestion boundary.
//!
//! Accepts the layout analysts export from spreadsheets:
//!
//! ```json
//! {
//!   "company_name": "Acme", "currency": "USD", "unit": "millions",
//!   "periods": ["FY2023", "FY2024"],
//!   "income_statement": { "FY2023": { "Net Sales": "$1,200", "COGS": "(700)" } },
//!   "balance_sheet":    { "FY2023": { "Cash": 150 } },
//!   "cash_flow":        { "FY2023": { "Capex": "-" } }
//! }
//! ```
//!
//! Field order follows first appearance, which the mapper uses to break
//! ties. Blank cells (`null`, `""`, `"-"`, `"N/A"`) are absent, not zero.

use serde_json::{Map, Value};
use std::path::Path;
use zero_common::ResultExt;

use crate::error::{Result, VerifyError};
use crate::model::{ModelMetadata, RawModel, StatementKind};

/// Accepted top-level keys per statement, first match wins.
const STATEMENT_KEYS: [(StatementKind, &[&str]); 3] = [
    (
        StatementKind::Income,
        &["income_statement", "income_statements", "is", "pnl", "p&l"],
    ),
    (StatementKind::Balance, &["balance_sheet", "balance_sheets", "bs"]),
    (
        StatementKind::CashFlow,
        &["cash_flow", "cash_flows", "cf", "cash_flow_statement"],
    ),
];

const BLANK_MARKERS: &[&str] = &["-", "—", "–", "n/a", "na", "#n/a", "nm"];

/// Parse an analyst-formatted number.
///
/// `"$1,234.5"` → 1234.5, `"(12)"` → -12, `"15%"` → 15. Blank markers give
/// `None`; anything else that is not a number is an error.
pub fn parse_number(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || BLANK_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        return Ok(None);
    }

    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| VerifyError::input(format!("unparseable number '{raw}'")))?;
    if !value.is_finite() {
        return Err(VerifyError::input(format!("non-finite number '{raw}'")));
    }
    Ok(Some(if negative { -value } else { value }))
}

fn cell_value(value: &Value, location: impl Fn() -> String) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| VerifyError::input(format!("number out of range at {}", location()))),
        Value::String(s) => parse_number(s).map_err(|e| match e {
            VerifyError::Input(msg) => VerifyError::input(format!("{msg} at {}", location())),
            other => other,
        }),
        _ => Err(VerifyError::input(format!(
            "expected a number at {}",
            location()
        ))),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(object: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(VerifyError::input(format!("'{key}' must list period labels"))),
            })
            .collect(),
        Some(_) => Err(VerifyError::input(format!("'{key}' must be an array"))),
    }
}

fn metadata(root: &Map<String, Value>) -> ModelMetadata {
    let nested = root.get("metadata").and_then(Value::as_object);
    let pick = |key: &str| string_field(root, key).or_else(|| nested.and_then(|m| string_field(m, key)));
    ModelMetadata {
        company_name: pick("company_name"),
        currency: pick("currency"),
        unit: pick("unit"),
    }
}

/// Build a raw model from parsed JSON.
pub fn from_value(value: &Value) -> Result<RawModel> {
    let root = value
        .as_object()
        .ok_or_else(|| VerifyError::input("model must be a JSON object"))?;

    let mut periods = string_list(root, "periods")?;
    if periods.is_empty() {
        periods = string_list(root, "historical_periods")?;
        periods.extend(string_list(root, "projected_periods")?);
    }
    let mut raw = RawModel {
        metadata: metadata(root),
        periods,
        ..RawModel::default()
    };

    for (kind, keys) in STATEMENT_KEYS {
        let present: Vec<&str> = keys.iter().copied().filter(|k| root.contains_key(*k)).collect();
        if present.len() > 1 {
            return Err(VerifyError::input(format!(
                "{} given more than once ({})",
                kind.title(),
                present.join(", ")
            )));
        }
        let Some(key) = present.first() else {
            continue;
        };
        let by_period = match &root[*key] {
            Value::Object(map) => map,
            Value::Null => continue,
            _ => {
                return Err(VerifyError::input(format!(
                    "'{key}' must map period labels to field values"
                )))
            }
        };

        let statement = raw.statement_mut(kind);
        for (period, fields) in by_period {
            let fields = fields.as_object().ok_or_else(|| {
                VerifyError::input(format!("'{key}.{period}' must map field names to values"))
            })?;
            for (field, cell) in fields {
                if field == "period" {
                    continue;
                }
                match cell_value(cell, || format!("{key}.{period}.{field}"))? {
                    Some(value) => statement.insert(field, period, value),
                    None => statement.declare(field),
                }
            }
        }
    }

    if StatementKind::ALL.iter().all(|kind| raw.statement(*kind).is_empty()) {
        return Err(VerifyError::input("model contains no statement data"));
    }
    tracing::debug!(
        periods = raw.periods.len(),
        income_fields = raw.income_statement.rows.len(),
        balance_fields = raw.balance_sheet.rows.len(),
        cash_flow_fields = raw.cash_flow.rows.len(),
        "Parsed model JSON"
    );
    Ok(raw)
}

pub fn from_json_str(content: &str) -> Result<RawModel> {
    let value: Value = serde_json::from_str(content)?;
    from_value(&value)
}

pub fn load_json(path: &Path) -> Result<RawModel> {
    let content = std::fs::read_to_string(path).context(format!("reading {}", path.display()))?;
    from_json_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1234.5", Some(1234.5) ; "plain")]
    #[test_case("$1,234.5", Some(1234.5) ; "currency and thousands")]
    #[test_case("(12)", Some(-12.0) ; "parenthesized negative")]
    #[test_case("($1,000)", Some(-1000.0) ; "parenthesized currency")]
    #[test_case("-7", Some(-7.0) ; "minus sign")]
    #[test_case("15%", Some(15.0) ; "percent kept as written")]
    #[test_case("-", None ; "dash")]
    #[test_case("—", None ; "em dash")]
    #[test_case("N/A", None ; "not available")]
    #[test_case("#N/A", None ; "spreadsheet error")]
    #[test_case("  ", None ; "blank")]
    fn test_parse_number(raw: &str, expected: Option<f64>) {
        assert_eq!(parse_number(raw).unwrap(), expected);
    }

    #[test_case("abc" ; "letters")]
    #[test_case("1.2.3" ; "two points")]
    #[test_case("inf" ; "infinity")]
    fn test_parse_number_rejects(raw: &str) {
        assert!(parse_number(raw).is_err());
    }

    #[test]
    fn test_statement_key_aliases_and_order() {
        let raw = from_json_str(
            r#"{
                "company_name": "Acme",
                "pnl": { "2024": { "Net Sales": "$1,200", "COGS": 700, "Other": null } },
                "bs": { "2024": { "Cash": "150" } },
                "cf": { "2024": { "Capex": "(30)", "period": "2024" } }
            }"#,
        )
        .unwrap();
        assert_eq!(raw.metadata.company_name.as_deref(), Some("Acme"));
        assert_eq!(raw.income_statement.field_names(), vec!["Net Sales", "COGS", "Other"]);
        assert!(raw.income_statement.rows[2].values.is_empty());
        assert_eq!(raw.cash_flow.rows.len(), 1);
        assert_eq!(raw.cash_flow.rows[0].values["2024"], -30.0);
        assert!(raw.periods.is_empty());
    }

    #[test]
    fn test_historical_and_projected_periods() {
        let raw = from_json_str(
            r#"{
                "historical_periods": ["2023A"],
                "projected_periods": ["2024E"],
                "metadata": { "currency": "EUR" },
                "is": { "2023A": { "Revenue": 1 }, "2024E": { "Revenue": 2 } }
            }"#,
        )
        .unwrap();
        assert_eq!(raw.periods, vec!["2023A", "2024E"]);
        assert_eq!(raw.metadata.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(from_json_str("[]").is_err());
        assert!(from_json_str(r#"{ "periods": ["2024"] }"#).is_err());
        assert!(from_json_str(r#"{ "is": { "2024": 5 } }"#).is_err());
        assert!(from_json_str(r#"{ "is": {}, "pnl": {} }"#).is_err());

        let err = from_json_str(r#"{ "bs": { "2024": { "Cash": "lots" } } }"#).unwrap_err();
        assert!(err.to_string().contains("bs.2024.Cash"), "{err}");
        let err = from_json_str(r#"{ "bs": { "2024": { "Cash": true } } }"#).unwrap_err();
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_load_json_missing_file() {
        let err = load_json(Path::new("/nonexistent/model.json")).unwrap_err();
        assert_eq!(err.exit_code(), 66);
    }
}
