//! Canonical financial model and raw ingestion records.
//!
//! Two shapes live here:
//!
//! - [`RawModel`]: what ingestion hands over. Raw field names as they appear
//!   in the source, values per period label, field order preserved.
//! - [`FinancialModel`]: the mapped, validated model the checks read.
//!   Periods are unique and chronologically ordered; a line item that was not
//!   supplied is absent, never zero.

pub mod line_item;
pub mod period;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, VerifyError};

pub use line_item::{LineItem, StatementKind, OUTFLOW_ITEMS};
pub use period::{sort_chronologically, PeriodKey};

// ============================================================================
// Canonical Model
// ============================================================================

/// Descriptive metadata carried through to the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One statement for one period: canonical line item to value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    kind: StatementKind,
    values: BTreeMap<LineItem, f64>,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Set a value. The line item must belong to this statement.
    pub fn insert(&mut self, item: LineItem, value: f64) -> Result<()> {
        if item.statement() != self.kind {
            return Err(VerifyError::input(format!(
                "line item '{item}' does not belong to the {}",
                self.kind.title()
            )));
        }
        self.values.insert(item, value);
        Ok(())
    }

    pub fn get(&self, item: LineItem) -> Option<f64> {
        self.values.get(&item).copied()
    }

    pub fn contains(&self, item: LineItem) -> bool {
        self.values.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LineItem, f64)> + '_ {
        self.values.iter().map(|(item, value)| (*item, *value))
    }
}

/// One reporting period with its three statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub label: String,
    pub income: Statement,
    pub balance: Statement,
    pub cash_flow: Statement,
}

impl Period {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            income: Statement::new(StatementKind::Income),
            balance: Statement::new(StatementKind::Balance),
            cash_flow: Statement::new(StatementKind::CashFlow),
        }
    }

    pub fn statement(&self, kind: StatementKind) -> &Statement {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::Balance => &self.balance,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn statement_mut(&mut self, kind: StatementKind) -> &mut Statement {
        match kind {
            StatementKind::Income => &mut self.income,
            StatementKind::Balance => &mut self.balance,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }

    /// Look up a line item on whichever statement owns it.
    pub fn get(&self, item: LineItem) -> Option<f64> {
        self.statement(item.statement()).get(item)
    }

    /// Builder-style setter, mainly for tests and programmatic models.
    pub fn with(mut self, item: LineItem, value: f64) -> Self {
        self.values_mut(item).insert(item, value);
        self
    }

    fn values_mut(&mut self, item: LineItem) -> &mut BTreeMap<LineItem, f64> {
        &mut self.statement_mut(item.statement()).values
    }
}

/// A validated three-statement model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialModel {
    pub metadata: ModelMetadata,
    periods: Vec<Period>,
}

impl FinancialModel {
    /// Build a model from periods already in chronological order.
    ///
    /// Rejects an empty period list, duplicate labels and non-finite values.
    pub fn new(metadata: ModelMetadata, periods: Vec<Period>) -> Result<Self> {
        if periods.is_empty() {
            return Err(VerifyError::input("model has no periods"));
        }

        let mut seen = HashSet::new();
        for period in &periods {
            if period.label.trim().is_empty() {
                return Err(VerifyError::input("period label must not be empty"));
            }
            if !seen.insert(period.label.as_str()) {
                return Err(VerifyError::input(format!(
                    "duplicate period '{}'",
                    period.label
                )));
            }
            for kind in StatementKind::ALL {
                for (item, value) in period.statement(kind).iter() {
                    if !value.is_finite() {
                        return Err(VerifyError::input(format!(
                            "non-finite value for {}.{item} in period '{}'",
                            kind, period.label
                        )));
                    }
                }
            }
        }

        Ok(Self { metadata, periods })
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period(&self, label: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.label == label)
    }

    pub fn period_labels(&self) -> Vec<&str> {
        self.periods.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

// ============================================================================
// Raw Records (ingestion boundary)
// ============================================================================

/// One raw field (row) of a statement with its value per period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub field: String,
    pub values: BTreeMap<String, f64>,
}

/// Raw fields of one statement, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatement {
    pub rows: Vec<RawRow>,
}

impl RawStatement {
    /// Record a value. A field seen for the first time is appended, so row
    /// order follows first occurrence in the source.
    pub fn insert(&mut self, field: &str, period: &str, value: f64) {
        match self.rows.iter_mut().find(|row| row.field == field) {
            Some(row) => {
                row.values.insert(period.to_string(), value);
            }
            None => {
                let mut values = BTreeMap::new();
                values.insert(period.to_string(), value);
                self.rows.push(RawRow {
                    field: field.to_string(),
                    values,
                });
            }
        }
    }

    /// Register a field with no values (every cell blank).
    pub fn declare(&mut self, field: &str) {
        if !self.rows.iter().any(|row| row.field == field) {
            self.rows.push(RawRow {
                field: field.to_string(),
                values: BTreeMap::new(),
            });
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.field.as_str()).collect()
    }

    /// Every period label that has at least one value.
    pub fn period_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for row in &self.rows {
            for label in row.values.keys() {
                if !labels.contains(&label.as_str()) {
                    labels.push(label.as_str());
                }
            }
        }
        labels
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Raw model as handed over by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawModel {
    #[serde(default)]
    pub metadata: ModelMetadata,
    /// Ordered period labels. Empty means "sort the labels found in the data".
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub income_statement: RawStatement,
    #[serde(default)]
    pub balance_sheet: RawStatement,
    #[serde(default)]
    pub cash_flow: RawStatement,
}

impl RawModel {
    pub fn statement(&self, kind: StatementKind) -> &RawStatement {
        match kind {
            StatementKind::Income => &self.income_statement,
            StatementKind::Balance => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn statement_mut(&mut self, kind: StatementKind) -> &mut RawStatement {
        match kind {
            StatementKind::Income => &mut self.income_statement,
            StatementKind::Balance => &mut self.balance_sheet,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }

    /// Resolve the ordered period list.
    ///
    /// With an explicit list, every label found in the data must appear in
    /// it. Without one, the labels found are sorted chronologically.
    pub fn resolve_periods(&self) -> Result<Vec<String>> {
        let mut found: Vec<String> = Vec::new();
        for kind in StatementKind::ALL {
            for label in self.statement(kind).period_labels() {
                if !found.iter().any(|f| f == label) {
                    found.push(label.to_string());
                }
            }
        }

        if self.periods.is_empty() {
            if found.is_empty() {
                return Err(VerifyError::input("model has no periods"));
            }
            return sort_chronologically(&found);
        }

        let mut seen = HashSet::new();
        for label in &self.periods {
            if !seen.insert(label.as_str()) {
                return Err(VerifyError::input(format!("duplicate period '{label}'")));
            }
        }
        if let Some(unknown) = found.iter().find(|label| !seen.contains(label.as_str())) {
            return Err(VerifyError::input(format!(
                "statement data for unknown period '{unknown}'"
            )));
        }
        Ok(self.periods.clone())
    }
}
