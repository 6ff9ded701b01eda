//! Period label parsing and chronological ordering.
//!
//! Accepted forms (case-insensitive, spaces/dashes/underscores ignored):
//! `2024`, `FY2024`, `CY2023A`, `2024E`, `FY24`, `Q1-2025`, `2025Q1`,
//! `Q3 FY2024`, `H1 2024`, `2024H2`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, VerifyError};

static ANNUAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:FY|CY)?(\d{4})[AEPFB]?$").expect("valid annual pattern"));
static ANNUAL_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:FY|CY)(\d{2})[AEPFB]?$").expect("valid short annual pattern"));
static SUB_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([QH])([1-4])(?:FY|CY)?(\d{4})[AEPFB]?$").expect("valid sub-period pattern")
});
static SUB_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:FY|CY)?(\d{4})([QH])([1-4])[AEPFB]?$").expect("valid sub-period pattern")
});

/// Sortable position of a period: `(year, closing month)`.
///
/// Quarters close at month `q * 3`, halves at `h * 6`, years at 12, so
/// `Q4-2024`, `H2 2024` and `FY2024` share the same sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    /// Parse a period label.
    pub fn parse(label: &str) -> Result<Self> {
        let compact: String = label
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_' | '.' | '/'))
            .collect();

        if let Some(caps) = ANNUAL.captures(&compact) {
            return Ok(Self {
                year: parse_year(&caps[1], label)?,
                month: 12,
            });
        }
        if let Some(caps) = ANNUAL_SHORT.captures(&compact) {
            return Ok(Self {
                year: 2000 + parse_year(&caps[1], label)?,
                month: 12,
            });
        }
        if let Some(caps) = SUB_PREFIX.captures(&compact) {
            return sub_period(&caps[1], &caps[2], &caps[3], label);
        }
        if let Some(caps) = SUB_SUFFIX.captures(&compact) {
            return sub_period(&caps[2], &caps[3], &caps[1], label);
        }

        Err(VerifyError::input(format!(
            "unrecognised period label '{label}'"
        )))
    }
}

fn parse_year(digits: &str, label: &str) -> Result<i32> {
    digits
        .parse()
        .map_err(|_| VerifyError::input(format!("bad year in period label '{label}'")))
}

fn sub_period(kind: &str, index: &str, year: &str, label: &str) -> Result<PeriodKey> {
    let index: u32 = index
        .parse()
        .map_err(|_| VerifyError::input(format!("bad period index in '{label}'")))?;
    let month = match kind {
        "Q" => index * 3,
        "H" if index <= 2 => index * 6,
        _ => {
            return Err(VerifyError::input(format!(
                "unrecognised period label '{label}'"
            )))
        }
    };
    Ok(PeriodKey {
        year: parse_year(year, label)?,
        month,
    })
}

/// Sort labels chronologically. Labels with equal keys keep their input order.
pub fn sort_chronologically(labels: &[String]) -> Result<Vec<String>> {
    let mut keyed = labels
        .iter()
        .map(|label| PeriodKey::parse(label).map(|key| (key, label.clone())))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, label)| label).collect())
}
