//! Field-name normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesis pattern"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_\-./\\]").expect("valid separator pattern"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9& ]").expect("valid character pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Words that carry no identity in a line-item name.
pub const FILLER_WORDS: &[&str] = &[
    "total", "net", "less", "gross", "of", "the", "and", "in", "from", "for", "to", "at", "on",
];

/// Normalize a field name for comparison.
///
/// Lowercases, drops parenthesized text such as `($M)`, turns `_ - . / \`
/// into spaces, keeps only `a-z 0-9 &` and collapses whitespace. `&` survives
/// so that `SG&A`, `R&D` and `D&A` stay recognisable.
pub fn normalize(name: &str) -> String {
    let s = name.to_lowercase();
    let s = PARENTHESIZED.replace_all(&s, " ");
    let s = SEPARATORS.replace_all(&s, " ");
    let s = DISALLOWED.replace_all(&s, "");
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// [`normalize`], then strip [`FILLER_WORDS`].
pub fn normalize_aggressive(name: &str) -> String {
    normalize(name)
        .split(' ')
        .filter(|word| !word.is_empty() && !FILLER_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Total Revenue", "total revenue")]
    #[test_case("  Net_Income  ", "net income")]
    #[test_case("SG&A", "sg&a")]
    #[test_case("Revenue ($M)", "revenue")]
    #[test_case("Cash/Equivalents", "cash equivalents")]
    #[test_case("D&A - Depreciation", "d&a depreciation")]
    #[test_case("Net Rev.", "net rev")]
    #[test_case("Capex, net*", "capex net")]
    fn test_normalize(raw: &str, expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[test_case("Total Current Assets", "current assets")]
    #[test_case("Net Cash from Operating Activities", "cash operating activities")]
    #[test_case("Less: Cost of Goods Sold", "cost goods sold")]
    #[test_case("Net", "")]
    fn test_normalize_aggressive(raw: &str, expected: &str) {
        assert_eq!(normalize_aggressive(raw), expected);
    }
}
