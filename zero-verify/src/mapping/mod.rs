//! Field mapping: raw field names to canonical line items.
//!
//! Each statement is mapped independently in three passes over the raw
//! fields, highest tier first:
//!
//! 1. **Exact**: normalized name equals a line item's label.
//! 2. **Alias**: normalized name equals a configured alias, or the two agree
//!    once filler words are stripped.
//! 3. **Fuzzy**: best similarity against label and aliases, accepted at or
//!    above the threshold. A field whose two best keys score within the
//!    ambiguity margin stays unmapped.
//!
//! A line item is supplied by at most one raw field. Within the exact and
//! alias tiers the first field in input order wins; among fuzzy candidates
//! the highest score wins, ties going to the earlier field.

pub mod config;
pub mod normalize;
pub mod similarity;
pub mod template;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::Result;
use crate::model::{FinancialModel, LineItem, Period, RawModel, StatementKind};

pub use config::{MappingConfig, MappingFile, MappingSettings};
pub use normalize::{normalize, normalize_aggressive};
pub use similarity::{CompositeSimilarity, SimilarityMetric};

/// Number of fuzzy candidates kept per field for diagnostics.
const MAX_CANDIDATES: usize = 3;

/// How a raw field was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Alias,
    Fuzzy,
    Unmapped,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Fuzzy => "fuzzy",
            Self::Unmapped => "unmapped",
        };
        f.write_str(name)
    }
}

/// A scored fuzzy candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub key: LineItem,
    pub score: f64,
}

/// Resolution of one raw field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    pub raw_name: String,
    pub normalized_name: String,
    pub statement: StatementKind,
    pub canonical_key: Option<LineItem>,
    pub match_tier: MatchTier,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FieldMapping {
    fn unresolved(raw_name: &str, normalized_name: String, statement: StatementKind) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            normalized_name,
            statement,
            canonical_key: None,
            match_tier: MatchTier::Unmapped,
            confidence: 0.0,
            candidates: Vec::new(),
            note: None,
        }
    }

    fn resolve(&mut self, key: LineItem, tier: MatchTier, confidence: f64) {
        self.canonical_key = Some(key);
        self.match_tier = tier;
        self.confidence = confidence;
    }

    pub fn is_mapped(&self) -> bool {
        self.canonical_key.is_some()
    }
}

/// Mapping outcome for one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementDiagnostics {
    pub statement: StatementKind,
    /// One entry per raw field, in input order.
    pub fields: Vec<FieldMapping>,
    /// Supplier of every resolved line item.
    pub resolved: BTreeMap<LineItem, String>,
}

impl StatementDiagnostics {
    pub fn count(&self, tier: MatchTier) -> usize {
        self.fields.iter().filter(|f| f.match_tier == tier).count()
    }

    pub fn unmapped(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().filter(|f| !f.is_mapped())
    }

    /// Raw field that supplies `item`, if any.
    pub fn supplier(&self, item: LineItem) -> Option<&str> {
        self.resolved.get(&item).map(String::as_str)
    }

    fn raw_for(&self, item: LineItem) -> Option<&FieldMapping> {
        let raw = self.resolved.get(&item)?;
        self.fields.iter().find(|f| &f.raw_name == raw)
    }
}

/// A cash-flow outflow that arrived positive and was negated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignAdjustment {
    pub period: String,
    pub key: LineItem,
    pub original: f64,
}

/// Diagnostics for a whole model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingDiagnostics {
    pub statements: Vec<StatementDiagnostics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sign_adjustments: Vec<SignAdjustment>,
}

impl MappingDiagnostics {
    pub fn statement(&self, kind: StatementKind) -> Option<&StatementDiagnostics> {
        self.statements.iter().find(|s| s.statement == kind)
    }

    pub fn count(&self, tier: MatchTier) -> usize {
        self.statements.iter().map(|s| s.count(tier)).sum()
    }

    pub fn total_fields(&self) -> usize {
        self.statements.iter().map(|s| s.fields.len()).sum()
    }

    /// Resolution of one raw field.
    pub fn field(&self, kind: StatementKind, raw_name: &str) -> Option<&FieldMapping> {
        self.statement(kind)?
            .fields
            .iter()
            .find(|f| f.raw_name == raw_name)
    }

    /// Mapping that supplied a canonical line item.
    pub fn mapping_for(&self, item: LineItem) -> Option<&FieldMapping> {
        self.statement(item.statement())?.raw_for(item)
    }
}

// ============================================================================
// Field Mapper
// ============================================================================

/// Targets a raw name can match for one line item.
struct KeyTargets {
    item: LineItem,
    label: String,
    aliases: Vec<String>,
    stripped: Vec<String>,
}

impl KeyTargets {
    fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Maps raw field names to canonical line items.
pub struct FieldMapper<M: SimilarityMetric = CompositeSimilarity> {
    config: MappingConfig,
    metric: M,
}

impl FieldMapper<CompositeSimilarity> {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            metric: CompositeSimilarity::default(),
        }
    }
}

impl Default for FieldMapper<CompositeSimilarity> {
    fn default() -> Self {
        Self::new(MappingConfig::builtin())
    }
}

impl<M: SimilarityMetric> FieldMapper<M> {
    pub fn with_metric(config: MappingConfig, metric: M) -> Self {
        Self { config, metric }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    fn targets(&self, kind: StatementKind) -> Vec<KeyTargets> {
        LineItem::for_statement(kind)
            .map(|item| {
                let label = item.label();
                let aliases = self.config.normalized_aliases(item);
                let mut stripped: Vec<String> = std::iter::once(label.as_str())
                    .chain(aliases.iter().map(String::as_str))
                    .map(normalize_aggressive)
                    .filter(|s| !s.is_empty())
                    .collect();
                stripped.dedup();
                KeyTargets {
                    item,
                    label,
                    aliases,
                    stripped,
                }
            })
            .collect()
    }

    /// Map the raw field names of one statement.
    pub fn map_statement(&self, kind: StatementKind, raw_names: &[&str]) -> StatementDiagnostics {
        let targets = self.targets(kind);
        let mut fields: Vec<FieldMapping> = raw_names
            .iter()
            .map(|raw| FieldMapping::unresolved(raw, normalize(raw), kind))
            .collect();
        let mut taken: HashMap<LineItem, usize> = HashMap::new();

        // Exact tier
        for (idx, field) in fields.iter_mut().enumerate() {
            if let Some(target) = targets.iter().find(|t| t.label == field.normalized_name) {
                claim(field, idx, target.item, MatchTier::Exact, 1.0, &mut taken);
            }
        }

        // Alias tier
        for (idx, field) in fields.iter_mut().enumerate() {
            if field.is_mapped() || field.note.is_some() || field.normalized_name.is_empty() {
                continue;
            }
            let direct = targets
                .iter()
                .find(|t| t.aliases.iter().any(|a| *a == field.normalized_name));
            let matched = match direct {
                Some(target) => Some(target.item),
                None => {
                    let stripped = normalize_aggressive(&field.raw_name);
                    let hits: Vec<LineItem> = targets
                        .iter()
                        .filter(|t| !stripped.is_empty() && t.stripped.contains(&stripped))
                        .map(|t| t.item)
                        .collect();
                    match hits.as_slice() {
                        [single] => Some(*single),
                        _ => None,
                    }
                }
            };
            if let Some(item) = matched {
                claim(field, idx, item, MatchTier::Alias, 1.0, &mut taken);
            }
        }

        // Fuzzy tier
        let threshold = self.config.settings.fuzzy_threshold;
        let margin = self.config.settings.ambiguity_margin;
        let mut proposals: Vec<(usize, LineItem, f64)> = Vec::new();
        for (idx, field) in fields.iter_mut().enumerate() {
            if field.is_mapped() || field.note.is_some() || field.normalized_name.is_empty() {
                continue;
            }
            let mut scored: Vec<Candidate> = targets
                .iter()
                .filter(|t| !taken.contains_key(&t.item))
                .map(|t| Candidate {
                    key: t.item,
                    score: t
                        .all()
                        .map(|target| self.metric.score(&field.normalized_name, target))
                        .fold(0.0, f64::max),
                })
                .filter(|c| c.score > 0.0)
                .collect();
            // Stable sort keeps presentation order among equal scores.
            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            scored.truncate(MAX_CANDIDATES);
            field.candidates = scored.clone();

            let Some(best) = scored.first().copied() else {
                continue;
            };
            if best.score < threshold {
                continue;
            }
            if let Some(second) = scored.get(1) {
                if second.score >= threshold && best.score - second.score <= margin {
                    tracing::debug!(
                        statement = %kind,
                        raw = %field.raw_name,
                        first = %best.key,
                        second = %second.key,
                        "Ambiguous fuzzy match, leaving unmapped"
                    );
                    field.note = Some(format!(
                        "ambiguous: {} ({:.2}) vs {} ({:.2})",
                        best.key, best.score, second.key, second.score
                    ));
                    continue;
                }
            }
            proposals.push((idx, best.key, best.score));
        }

        // Highest score first; equal scores keep input order.
        proposals.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
        for (idx, item, score) in proposals {
            let field = &mut fields[idx];
            if taken.contains_key(&item) {
                field.note = Some(format!("{item} already supplied by a higher-scoring field"));
                continue;
            }
            tracing::debug!(
                statement = %kind,
                raw = %field.raw_name,
                key = %item,
                score,
                "Fuzzy match"
            );
            claim(field, idx, item, MatchTier::Fuzzy, score, &mut taken);
        }

        let mut resolved = BTreeMap::new();
        for (item, idx) in &taken {
            resolved.insert(*item, fields[*idx].raw_name.clone());
        }

        StatementDiagnostics {
            statement: kind,
            fields,
            resolved,
        }
    }

    /// Diagnose-only mode: map every statement without building a model.
    pub fn diagnose(&self, raw: &RawModel) -> MappingDiagnostics {
        let statements = StatementKind::ALL
            .iter()
            .map(|kind| self.map_statement(*kind, &raw.statement(*kind).field_names()))
            .collect();
        MappingDiagnostics {
            statements,
            sign_adjustments: Vec::new(),
        }
    }

    /// Map a raw model and build the canonical model.
    pub fn build_model(&self, raw: &RawModel) -> Result<(FinancialModel, MappingDiagnostics)> {
        let labels = raw.resolve_periods()?;
        let mut diagnostics = self.diagnose(raw);
        let mut periods: Vec<Period> = labels.iter().map(Period::new).collect();

        for statement in &diagnostics.statements {
            let rows = &raw.statement(statement.statement).rows;
            for (item, raw_name) in &statement.resolved {
                let Some(row) = rows.iter().find(|r| &r.field == raw_name) else {
                    continue;
                };
                for period in periods.iter_mut() {
                    if let Some(value) = row.values.get(&period.label) {
                        let mut value = *value;
                        if self.config.settings.auto_sign_normalization
                            && item.is_outflow()
                            && value > 0.0
                        {
                            diagnostics.sign_adjustments.push(SignAdjustment {
                                period: period.label.clone(),
                                key: *item,
                                original: value,
                            });
                            value = -value;
                        }
                        period.statement_mut(item.statement()).insert(*item, value)?;
                    }
                }
            }
        }

        let model = FinancialModel::new(raw.metadata.clone(), periods)?;
        tracing::info!(
            periods = model.len(),
            fields = diagnostics.total_fields(),
            exact = diagnostics.count(MatchTier::Exact),
            alias = diagnostics.count(MatchTier::Alias),
            fuzzy = diagnostics.count(MatchTier::Fuzzy),
            unmapped = diagnostics.count(MatchTier::Unmapped),
            sign_adjustments = diagnostics.sign_adjustments.len(),
            "Model mapped"
        );
        Ok((model, diagnostics))
    }
}

fn claim(
    field: &mut FieldMapping,
    idx: usize,
    item: LineItem,
    tier: MatchTier,
    confidence: f64,
    taken: &mut HashMap<LineItem, usize>,
) {
    if taken.contains_key(&item) {
        field.note = Some(format!("duplicate of an earlier field for {item}"));
        return;
    }
    field.resolve(item, tier, confidence);
    taken.insert(item, idx);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> FieldMapper {
        FieldMapper::default()
    }

    // ========================================================================
    // Tiers
    // ========================================================================

    #[test]
    fn test_exact_tier() {
        let diag = mapper().map_statement(StatementKind::Income, &["Revenue", "Net_Income"]);
        assert_eq!(diag.fields[0].match_tier, MatchTier::Exact);
        assert_eq!(diag.fields[0].canonical_key, Some(LineItem::Revenue));
        assert_eq!(diag.fields[1].canonical_key, Some(LineItem::NetIncome));
        assert_eq!(diag.fields[1].confidence, 1.0);
    }

    #[test]
    fn test_alias_tier() {
        let diag = mapper().map_statement(StatementKind::Income, &["Net Sales", "Cost of Goods Sold"]);
        assert_eq!(diag.fields[0].match_tier, MatchTier::Alias);
        assert_eq!(diag.fields[0].canonical_key, Some(LineItem::Revenue));
        assert_eq!(diag.fields[1].canonical_key, Some(LineItem::Cogs));
    }

    #[test]
    fn test_alias_tier_strips_filler_words() {
        let diag = mapper().map_statement(StatementKind::Balance, &["Current Assets, total"]);
        assert_eq!(diag.fields[0].match_tier, MatchTier::Alias);
        assert_eq!(diag.fields[0].canonical_key, Some(LineItem::TotalCurrentAssets));
    }

    #[test]
    fn test_filler_collision_does_not_alias() {
        // "PP&E" strips to the same form as both gross and net PP&E.
        let diag = mapper().map_statement(StatementKind::Balance, &["PP&E"]);
        assert_ne!(diag.fields[0].match_tier, MatchTier::Alias);
    }

    #[test]
    fn test_fuzzy_tier() {
        let config = MappingConfig::empty().with_threshold(0.8);
        let diag = FieldMapper::new(config).map_statement(StatementKind::Income, &["Revenu"]);
        assert_eq!(diag.fields[0].match_tier, MatchTier::Fuzzy);
        assert_eq!(diag.fields[0].canonical_key, Some(LineItem::Revenue));
        assert!(diag.fields[0].confidence >= 0.8 && diag.fields[0].confidence < 1.0);
    }

    #[test]
    fn test_unmapped_is_not_an_error() {
        let diag = mapper().map_statement(StatementKind::Income, &["Headcount"]);
        assert_eq!(diag.fields[0].match_tier, MatchTier::Unmapped);
        assert_eq!(diag.unmapped().count(), 1);
        assert!(diag.resolved.is_empty());
    }

    // ========================================================================
    // Precedence & Uniqueness
    // ========================================================================

    #[test]
    fn test_exact_beats_earlier_alias() {
        let diag = mapper().map_statement(StatementKind::Income, &["Sales", "Revenue"]);
        assert_eq!(diag.supplier(LineItem::Revenue), Some("Revenue"));
        assert_eq!(diag.fields[0].match_tier, MatchTier::Unmapped);
        assert!(diag.fields[0].note.as_deref().unwrap_or("").contains("duplicate"));
    }

    #[test]
    fn test_duplicate_exact_first_wins() {
        let diag = mapper().map_statement(StatementKind::Balance, &["Cash", "cash"]);
        assert_eq!(diag.supplier(LineItem::Cash), Some("Cash"));
        assert!(!diag.fields[1].is_mapped());
    }

    #[test]
    fn test_fuzzy_highest_score_wins() {
        let diag = FieldMapper::new(MappingConfig::empty())
            .map_statement(StatementKind::Income, &["Revenu", "Revenues"]);
        assert_eq!(diag.supplier(LineItem::Revenue), Some("Revenues"));
        assert_eq!(diag.fields[1].match_tier, MatchTier::Fuzzy);
        assert!(!diag.fields[0].is_mapped());
        assert!(diag.fields[0].note.as_deref().unwrap_or("").contains("already supplied"));
    }

    #[test]
    fn test_ambiguity_guard() {
        struct Flat;
        impl SimilarityMetric for Flat {
            fn score(&self, _a: &str, b: &str) -> f64 {
                match b {
                    "revenue" => 0.93,
                    "cogs" => 0.91,
                    _ => 0.1,
                }
            }
        }
        let diag = FieldMapper::with_metric(MappingConfig::empty(), Flat)
            .map_statement(StatementKind::Income, &["Sales-ish"]);
        let field = &diag.fields[0];
        assert!(!field.is_mapped());
        assert_eq!(field.candidates[0].key, LineItem::Revenue);
        assert_eq!(field.candidates[1].key, LineItem::Cogs);
        assert!(field.note.as_deref().unwrap_or("").starts_with("ambiguous"));
    }

    // ========================================================================
    // Model Building
    // ========================================================================

    #[test]
    fn test_build_model_with_sign_normalization() {
        let mut raw = RawModel::default();
        raw.income_statement.insert("Revenue", "2024", 100.0);
        raw.cash_flow.insert("Capital Expenditures", "2024", 12.0);
        raw.cash_flow.insert("Dividends", "2024", -3.0);

        let (model, diag) = mapper().build_model(&raw).unwrap();
        let period = &model.periods()[0];
        assert_eq!(period.get(LineItem::Capex), Some(-12.0));
        assert_eq!(period.get(LineItem::DividendsPaid), Some(-3.0));
        assert_eq!(diag.sign_adjustments.len(), 1);
        assert_eq!(diag.sign_adjustments[0].key, LineItem::Capex);
    }

    #[test]
    fn test_build_model_without_sign_normalization() {
        let mut config = MappingConfig::builtin();
        config.settings.auto_sign_normalization = false;
        let mut raw = RawModel::default();
        raw.cash_flow.insert("capex", "2024", 12.0);
        let (model, diag) = FieldMapper::new(config).build_model(&raw).unwrap();
        assert_eq!(model.periods()[0].get(LineItem::Capex), Some(12.0));
        assert!(diag.sign_adjustments.is_empty());
    }

    #[test]
    fn test_blank_cells_stay_absent() {
        let mut raw = RawModel::default();
        raw.balance_sheet.insert("Cash", "2024", 5.0);
        raw.balance_sheet.declare("Inventory");
        let (model, _) = mapper().build_model(&raw).unwrap();
        assert_eq!(model.periods()[0].get(LineItem::Inventory), None);
    }
}
