//! Mapping-file template generation.
//!
//! Bootstraps a mapping file from an analyst's model: every resolved line
//! item is listed with the raw names that resolved to it, and raw names that
//! did not resolve are listed in a trailing comment block for manual triage.

use std::fmt::Write as _;

use super::config::{AliasEntry, FileSettings, MappingFile};
use super::{FieldMapper, MappingDiagnostics, SimilarityMetric};
use crate::error::Result;
use crate::model::{RawModel, StatementKind};

/// Build a mapping file from diagnostics.
///
/// Raw names that already equal the line item's label are left out; they
/// need no alias.
pub fn template_file(diagnostics: &MappingDiagnostics, settings: FileSettings) -> MappingFile {
    let mut file = MappingFile {
        settings,
        ..MappingFile::default()
    };
    for statement in &diagnostics.statements {
        let section = file.section_mut(statement.statement);
        for field in &statement.fields {
            let Some(item) = field.canonical_key else {
                continue;
            };
            let entry = section.entry(item.name().to_string()).or_insert_with(AliasEntry::default);
            if field.normalized_name != item.label() && !entry.aliases.contains(&field.raw_name) {
                entry.aliases.push(field.raw_name.clone());
            }
        }
    }
    file
}

/// Render a YAML template for a raw model.
pub fn generate_template<M: SimilarityMetric>(mapper: &FieldMapper<M>, raw: &RawModel) -> Result<String> {
    let diagnostics = mapper.diagnose(raw);
    let current = &mapper.config().settings;
    let settings = FileSettings {
        fuzzy_threshold: Some(current.fuzzy_threshold),
        ambiguity_margin: Some(current.ambiguity_margin),
        auto_sign_normalization: Some(current.auto_sign_normalization),
    };

    let file = template_file(&diagnostics, settings);
    let mut out = String::from("# Field mapping generated from model field names.\n");
    out.push_str("# Review fuzzy matches before relying on this file.\n");
    out.push_str(&serde_yaml::to_string(&file)?);

    let unmapped: Vec<_> = diagnostics
        .statements
        .iter()
        .flat_map(|s| s.unmapped())
        .collect();
    if !unmapped.is_empty() {
        out.push_str("\n# Unmapped fields (add them as aliases above if they belong to a line item):\n");
        for field in unmapped {
            let hint = field
                .candidates
                .first()
                .map(|c| format!(" (closest: {} {:.2})", c.key, c.score))
                .unwrap_or_default();
            // Writing into a String cannot fail.
            let _ = writeln!(out, "#   {}: {}{}", field.statement, field.raw_name, hint);
        }
    }

    tracing::debug!(
        sections = StatementKind::ALL.len(),
        unmapped = diagnostics.count(super::MatchTier::Unmapped),
        "Generated mapping template"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingConfig, MatchTier};

    fn raw() -> RawModel {
        let mut raw = RawModel::default();
        raw.income_statement.insert("Net Sales", "2024", 100.0);
        raw.income_statement.insert("COGS", "2024", 40.0);
        raw.income_statement.insert("Widgets Shipped", "2024", 7.0);
        raw.balance_sheet.insert("Cash & Equivalents", "2024", 10.0);
        raw
    }

    #[test]
    fn test_template_lists_resolved_aliases() {
        let mapper = FieldMapper::default();
        let diagnostics = mapper.diagnose(&raw());
        let file = template_file(&diagnostics, FileSettings::default());

        assert_eq!(file.income_statement["revenue"].aliases, vec!["Net Sales"]);
        // Exact label needs no alias.
        assert!(file.income_statement["cogs"].aliases.is_empty());
        assert_eq!(file.balance_sheet["cash"].aliases, vec!["Cash & Equivalents"]);
        assert_eq!(diagnostics.count(MatchTier::Unmapped), 1);
    }

    #[test]
    fn test_rendered_template_round_trips() {
        let mapper = FieldMapper::default();
        let yaml = generate_template(&mapper, &raw()).unwrap();
        assert!(yaml.contains("#   income_statement: Widgets Shipped"));

        let parsed = MappingFile::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.settings.fuzzy_threshold, Some(0.85));
        assert!(MappingConfig::from_file(&parsed).is_ok());
    }
}
