//! Alias mapping configuration.
//!
//! The built-in alias table covers common analyst spellings. A YAML mapping
//! file extends it:
//!
//! ```yaml
//! settings:
//!   fuzzy_threshold: 0.85
//!   ambiguity_margin: 0.05
//!   auto_sign_normalization: true
//! income_statement:
//!   revenue:
//!     aliases: ["net sales", "turnover"]
//! balance_sheet: {}
//! cash_flow: {}
//! ```
//!
//! Aliases are added to the built-in ones; settings present in the file
//! replace the defaults. Any problem in the file is a configuration error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use zero_common::validation::within;
use zero_common::{ResultExt, Validate, ValidationError, ValidationResult};

use super::normalize::normalize;
use crate::error::Result;
use crate::model::{LineItem, StatementKind};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_AMBIGUITY_MARGIN: f64 = 0.05;

/// Line items that critical-severity checks depend on. A mapping file that
/// leaves them out is linted.
pub const CRITICAL_ITEMS: &[LineItem] = &[
    LineItem::NetIncome,
    LineItem::Cash,
    LineItem::TotalAssets,
    LineItem::TotalLiabilities,
    LineItem::TotalEquity,
    LineItem::CfNetIncome,
    LineItem::CashFromOperations,
    LineItem::CashFromInvesting,
    LineItem::CashFromFinancing,
    LineItem::NetChangeInCash,
    LineItem::BeginningCash,
    LineItem::EndingCash,
];

/// Built-in aliases, written the way analysts label rows.
const BUILTIN_ALIASES: &[(LineItem, &[&str])] = &[
    // Income statement
    (LineItem::Revenue, &["sales", "net sales", "total revenue", "net revenue", "revenues", "turnover", "total sales"]),
    (LineItem::Cogs, &["cost of goods sold", "cost of sales", "cost of revenue", "cost of revenues"]),
    (LineItem::GrossProfit, &["gross margin", "gross income"]),
    (LineItem::Sga, &["sg&a", "selling general and administrative", "selling general & administrative"]),
    (LineItem::Rd, &["r&d", "research and development", "research & development"]),
    (LineItem::OtherOpex, &["other operating expenses", "other operating expense"]),
    (LineItem::Depreciation, &["depreciation expense"]),
    (LineItem::Amortization, &["amortization expense", "amortisation"]),
    (LineItem::TotalOpex, &["operating expenses", "opex", "total operating expenses"]),
    (LineItem::Ebit, &["operating income", "operating profit", "income from operations"]),
    (LineItem::Ebitda, &["adjusted ebitda"]),
    (LineItem::InterestExpense, &["interest", "interest paid expense", "finance costs"]),
    (LineItem::InterestIncome, &["interest earned", "finance income"]),
    (LineItem::OtherIncomeExpense, &["other income", "other expense", "non operating income", "other income expense net"]),
    (LineItem::Ebt, &["pretax income", "pre tax income", "income before taxes", "earnings before taxes", "profit before tax"]),
    (LineItem::TaxExpense, &["income tax expense", "income taxes", "tax", "provision for income taxes"]),
    (LineItem::NetIncome, &["net earnings", "net profit", "profit after tax", "net income attributable"]),
    // Balance sheet
    (LineItem::Cash, &["cash and cash equivalents", "cash & equivalents", "cash and equivalents"]),
    (LineItem::ShortTermInvestments, &["marketable securities", "short term securities"]),
    (LineItem::AccountsReceivable, &["receivables", "trade receivables", "ar"]),
    (LineItem::Inventory, &["inventories", "stock"]),
    (LineItem::PrepaidExpenses, &["prepaids", "prepaid expenses and other"]),
    (LineItem::TotalCurrentAssets, &["current assets"]),
    (LineItem::PpeGross, &["gross ppe", "gross pp&e", "property plant and equipment gross"]),
    (LineItem::AccumulatedDepreciation, &["accumulated depreciation and amortization"]),
    (LineItem::PpeNet, &["net ppe", "net pp&e", "pp&e net", "property plant and equipment net"]),
    (LineItem::IntangibleAssets, &["intangibles"]),
    (LineItem::TotalNonCurrentAssets, &["non current assets", "long term assets"]),
    (LineItem::TotalAssets, &["assets"]),
    (LineItem::AccountsPayable, &["payables", "trade payables", "ap"]),
    (LineItem::AccruedLiabilities, &["accrued expenses", "accruals"]),
    (LineItem::ShortTermDebt, &["short term borrowings", "notes payable"]),
    (LineItem::CurrentPortionLtd, &["current portion of long term debt", "current maturities of long term debt"]),
    (LineItem::TotalCurrentLiabilities, &["current liabilities"]),
    (LineItem::LongTermDebt, &["long term borrowings", "senior notes"]),
    (LineItem::DeferredTaxLiability, &["deferred tax liabilities", "deferred income taxes"]),
    (LineItem::TotalNonCurrentLiabilities, &["non current liabilities", "long term liabilities"]),
    (LineItem::TotalLiabilities, &["liabilities"]),
    (LineItem::CommonStock, &["share capital", "common shares"]),
    (LineItem::AdditionalPaidInCapital, &["apic", "paid in capital", "share premium"]),
    (LineItem::RetainedEarnings, &["accumulated earnings", "retained profits"]),
    (LineItem::TreasuryStock, &["treasury shares"]),
    (LineItem::AccumulatedOtherComprehensiveIncome, &["aoci", "accumulated other comprehensive loss"]),
    (LineItem::TotalEquity, &["shareholders equity", "stockholders equity", "total shareholders equity", "total stockholders equity", "equity"]),
    (LineItem::TotalLiabilitiesAndEquity, &["total liabilities & equity", "total liabilities and shareholders equity", "liabilities and equity"]),
    // Cash flow statement
    (LineItem::DepreciationAmortization, &["d&a", "depreciation & amortization", "depreciation and amortisation", "depreciation"]),
    (LineItem::StockBasedCompensation, &["sbc", "share based compensation", "stock compensation"]),
    (LineItem::DeferredTaxes, &["deferred income taxes", "deferred tax"]),
    (LineItem::ChangeInReceivables, &["change in accounts receivable", "decrease increase in receivables"]),
    (LineItem::ChangeInInventory, &["change in inventories"]),
    (LineItem::ChangeInPayables, &["change in accounts payable"]),
    (LineItem::ChangeInOtherWorkingCapital, &["change in other working capital", "other working capital"]),
    (LineItem::OtherOperating, &["other operating activities", "other non cash items"]),
    (LineItem::CashFromOperations, &["cfo", "operating cash flow", "cash from operating activities", "net cash from operating activities"]),
    (LineItem::Capex, &["capital expenditures", "capital expenditure", "purchases of property and equipment", "purchase of ppe"]),
    (LineItem::AssetSales, &["proceeds from asset sales", "disposals of ppe", "proceeds from sale of ppe"]),
    (LineItem::Acquisitions, &["business acquisitions", "acquisitions net of cash acquired"]),
    (LineItem::PurchaseOfInvestments, &["purchases of investments"]),
    (LineItem::SaleOfInvestments, &["sales of investments", "proceeds from sale of investments"]),
    (LineItem::OtherInvesting, &["other investing activities"]),
    (LineItem::CashFromInvesting, &["cfi", "investing cash flow", "cash from investing activities", "net cash from investing activities"]),
    (LineItem::DebtIssuance, &["proceeds from debt", "borrowings", "issuance of debt"]),
    (LineItem::DebtRepayment, &["repayment of debt", "repayments of borrowings"]),
    (LineItem::EquityIssuance, &["issuance of stock", "proceeds from equity"]),
    (LineItem::ShareRepurchases, &["buybacks", "repurchase of shares", "share buybacks"]),
    (LineItem::DividendsPaid, &["dividends"]),
    (LineItem::OtherFinancing, &["other financing activities"]),
    (LineItem::CashFromFinancing, &["cff", "financing cash flow", "cash from financing activities", "net cash from financing activities"]),
    (LineItem::NetChangeInCash, &["change in cash", "net increase in cash", "net increase decrease in cash"]),
    (LineItem::BeginningCash, &["cash at beginning of period", "opening cash", "beginning cash balance"]),
    (LineItem::EndingCash, &["cash at end of period", "closing cash", "ending cash balance"]),
    (LineItem::FreeCashFlow, &["fcf"]),
];

// ============================================================================
// File Schema
// ============================================================================

/// Settings block of a mapping file. Absent values keep the current setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguity_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_sign_normalization: Option<bool>,
}

/// One canonical key's entry in a mapping file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A mapping file as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    #[serde(default)]
    pub settings: FileSettings,
    #[serde(default)]
    pub income_statement: BTreeMap<String, AliasEntry>,
    #[serde(default)]
    pub balance_sheet: BTreeMap<String, AliasEntry>,
    #[serde(default)]
    pub cash_flow: BTreeMap<String, AliasEntry>,
}

impl MappingFile {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("reading mapping file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    pub fn section(&self, kind: StatementKind) -> &BTreeMap<String, AliasEntry> {
        match kind {
            StatementKind::Income => &self.income_statement,
            StatementKind::Balance => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn section_mut(&mut self, kind: StatementKind) -> &mut BTreeMap<String, AliasEntry> {
        match kind {
            StatementKind::Income => &mut self.income_statement,
            StatementKind::Balance => &mut self.balance_sheet,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }

    /// Non-fatal findings about a mapping file.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for kind in StatementKind::ALL {
            for (key, entry) in self.section(kind) {
                if entry.aliases.is_empty() {
                    warnings.push(format!("{kind}.{key} has no aliases"));
                }
            }
        }
        for item in CRITICAL_ITEMS {
            if !self.section(item.statement()).contains_key(item.name()) {
                warnings.push(format!(
                    "{}.{} is used by critical checks but has no entry",
                    item.statement(),
                    item.name()
                ));
            }
        }
        warnings
    }
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Effective mapper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSettings {
    pub fuzzy_threshold: f64,
    pub ambiguity_margin: f64,
    pub auto_sign_normalization: bool,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
            auto_sign_normalization: true,
        }
    }
}

impl Validate for MappingSettings {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if !(self.fuzzy_threshold.is_finite()
            && self.fuzzy_threshold > 0.0
            && self.fuzzy_threshold <= 1.0)
        {
            errors.push(ValidationError::invalid(
                "mapping.settings.fuzzy_threshold",
                format!("must be in (0, 1] (got {})", self.fuzzy_threshold),
            ));
        }
        if self.ambiguity_margin >= 1.0 {
            errors.push(ValidationError::invalid(
                "mapping.settings.ambiguity_margin",
                format!("must be in [0, 1) (got {})", self.ambiguity_margin),
            ));
        } else if let Err(e) = within(
            "mapping.settings.ambiguity_margin",
            self.ambiguity_margin,
            0.0,
            1.0,
        ) {
            errors.push(e);
        }
        ValidationError::collect(errors)
    }
}

/// Alias table plus settings, ready for the mapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingConfig {
    pub settings: MappingSettings,
    aliases: BTreeMap<LineItem, Vec<String>>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MappingConfig {
    /// Default settings and no aliases; only exact labels and fuzzy matching apply.
    pub fn empty() -> Self {
        Self {
            settings: MappingSettings::default(),
            aliases: BTreeMap::new(),
        }
    }

    /// Default settings with the built-in alias table.
    pub fn builtin() -> Self {
        let mut config = Self::empty();
        for (item, aliases) in BUILTIN_ALIASES {
            for alias in *aliases {
                config.push_alias(*item, alias);
            }
        }
        config
    }

    /// Built-in table extended by a mapping file.
    pub fn from_file(file: &MappingFile) -> Result<Self> {
        let mut config = Self::builtin();
        config.extend(file)?;
        Ok(config)
    }

    /// Load and apply a YAML mapping file on top of the built-in table.
    pub fn load(path: &Path) -> Result<Self> {
        let file = MappingFile::load(path)?;
        Self::from_file(&file)
    }

    /// Add a file's aliases and settings, then validate the result.
    pub fn extend(&mut self, file: &MappingFile) -> Result<()> {
        let mut errors = Vec::new();
        for kind in StatementKind::ALL {
            for (key, entry) in file.section(kind) {
                let Some(item) = LineItem::from_name(kind, key) else {
                    errors.push(ValidationError::invalid(
                        format!("mapping.{kind}.{key}"),
                        format!("unknown canonical key for the {}", kind.title()),
                    ));
                    continue;
                };
                for alias in &entry.aliases {
                    if normalize(alias).is_empty() {
                        errors.push(ValidationError::invalid(
                            format!("mapping.{kind}.{key}"),
                            "alias must not be empty",
                        ));
                        continue;
                    }
                    self.push_alias(item, alias);
                }
            }
        }
        ValidationError::collect(errors)?;

        if let Some(threshold) = file.settings.fuzzy_threshold {
            self.settings.fuzzy_threshold = threshold;
        }
        if let Some(margin) = file.settings.ambiguity_margin {
            self.settings.ambiguity_margin = margin;
        }
        if let Some(sign) = file.settings.auto_sign_normalization {
            self.settings.auto_sign_normalization = sign;
        }

        self.validate()?;
        Ok(())
    }

    /// Add one alias (kept as written; compared after normalization).
    pub fn push_alias(&mut self, item: LineItem, alias: &str) {
        let entry = self.aliases.entry(item).or_default();
        let normalized = normalize(alias);
        if !entry.iter().any(|existing| normalize(existing) == normalized) {
            entry.push(alias.to_string());
        }
    }

    /// Builder-style variant of [`push_alias`](Self::push_alias).
    pub fn with_aliases(mut self, item: LineItem, aliases: &[&str]) -> Self {
        for alias in aliases {
            self.push_alias(item, alias);
        }
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.settings.fuzzy_threshold = threshold;
        self
    }

    /// Aliases registered for a line item, as written.
    pub fn aliases(&self, item: LineItem) -> &[String] {
        self.aliases.get(&item).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalized alias forms for a line item.
    pub fn normalized_aliases(&self, item: LineItem) -> Vec<String> {
        self.aliases(item).iter().map(|a| normalize(a)).collect()
    }
}

impl Validate for MappingConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.settings.validate() {
            errors.push(e);
        }

        for kind in StatementKind::ALL {
            let labels: HashMap<String, LineItem> = LineItem::for_statement(kind)
                .map(|item| (item.label(), item))
                .collect();
            let mut claimed: HashMap<String, LineItem> = HashMap::new();

            for item in LineItem::for_statement(kind) {
                for alias in self.normalized_aliases(item) {
                    if alias.is_empty() {
                        errors.push(ValidationError::invalid(
                            format!("mapping.{kind}.{item}"),
                            "alias must not be empty",
                        ));
                        continue;
                    }
                    if let Some(owner) = labels.get(&alias) {
                        if *owner != item {
                            errors.push(ValidationError::Conflict {
                                reason: format!(
                                    "{kind}: alias '{alias}' of {item} is the label of {owner}"
                                ),
                            });
                        }
                    }
                    match claimed.get(&alias) {
                        Some(owner) if *owner != item => {
                            errors.push(ValidationError::Conflict {
                                reason: format!(
                                    "{kind}: alias '{alias}' is claimed by both {owner} and {item}"
                                ),
                            });
                        }
                        _ => {
                            claimed.insert(alias, item);
                        }
                    }
                }
            }
        }

        ValidationError::collect(errors)
    }
}
