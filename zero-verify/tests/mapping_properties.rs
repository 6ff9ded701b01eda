//! Property tests for the comparator and field mapper.

use proptest::prelude::*;

use zero_verify::mapping::{normalize, MatchTier};
use zero_verify::{FieldMapper, LineItem, MappingConfig, RawModel, Tolerance};

fn diagnose_one(mapper: &FieldMapper, item: LineItem, raw_name: &str) -> (Option<LineItem>, MatchTier) {
    let mut raw = RawModel::default();
    raw.statement_mut(item.statement()).insert(raw_name, "2024", 1.0);
    let diagnostics = mapper.diagnose(&raw);
    let field = diagnostics.field(item.statement(), raw_name).unwrap();
    (field.canonical_key, field.match_tier)
}

proptest! {
    #[test]
    fn tolerance_is_symmetric(
        a in -1e9f64..1e9,
        b in -1e9f64..1e9,
        absolute in 0.0f64..10.0,
        relative in 0.0f64..0.01,
    ) {
        let tolerance = Tolerance::new(absolute, relative);
        prop_assert_eq!(tolerance.compare(a, b), tolerance.compare(b, a));
    }

    #[test]
    fn gaps_inside_absolute_tolerance_are_equal(a in -1e6f64..1e6, gap in -0.49f64..0.49) {
        prop_assert!(Tolerance::default().is_equal(a, a + gap));
    }

    #[test]
    fn relative_tolerance_scales_with_magnitude(a in 1e4f64..1e9) {
        let tolerance = Tolerance::new(0.0, 0.001);
        prop_assert!(tolerance.is_equal(a, a * 1.0005));
        prop_assert!(!tolerance.is_equal(a, a * 1.002));
    }

    #[test]
    fn normalize_is_idempotent(name in "[A-Za-z0-9 &()_./$%-]{0,40}") {
        let once = normalize(&name);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn canonical_names_map_exactly(index in 0..LineItem::ALL.len(), threshold in 0.5f64..1.0, upper in any::<bool>()) {
        let item = LineItem::ALL[index];
        let raw_name = if upper { item.name().to_uppercase() } else { item.name().to_string() };
        let mapper = FieldMapper::new(MappingConfig::builtin().with_threshold(threshold));
        prop_assert_eq!(diagnose_one(&mapper, item, &raw_name), (Some(item), MatchTier::Exact));
    }

    #[test]
    fn aliases_beat_fuzzy(index in 0..LineItem::ALL.len(), pick in any::<prop::sample::Index>()) {
        let item = LineItem::ALL[index];
        let config = MappingConfig::builtin();
        let aliases = config.aliases(item).to_vec();
        prop_assume!(!aliases.is_empty());
        let alias = pick.get(&aliases);

        let mapper = FieldMapper::new(config);
        prop_assert_eq!(diagnose_one(&mapper, item, alias), (Some(item), MatchTier::Alias));
    }
}
