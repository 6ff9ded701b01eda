//! Check registry.
//!
//! The 32 checks are a closed set: one [`CheckKind`] variant per check id,
//! described once in the static [`REGISTRY`] table. The table is ordered by
//! category then id, which is also the order results are reported in.
//!
//! Each check evaluates one period at a time through a [`CheckContext`] and
//! returns an [`Outcome`]. Missing inputs, first-period exemptions and fault
//! isolation are handled by the engine before and after evaluation, so the
//! check functions only deal with arithmetic.

pub mod cross_statement;
pub mod reasonableness;
pub mod structural;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{LineItem, Period};
use crate::tolerance::Tolerance;

pub use reasonableness::ReasonablenessConfig;

// ============================================================================
// Classification
// ============================================================================

/// Severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Info, Self::Warning, Self::Error, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Check category, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Structural,
    CrossStatement,
    Reasonableness,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 3] = [Self::Structural, Self::CrossStatement, Self::Reasonableness];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::CrossStatement => "cross_statement",
            Self::Reasonableness => "reasonableness",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "structural" => Ok(Self::Structural),
            "cross_statement" => Ok(Self::CrossStatement),
            "reasonableness" => Ok(Self::Reasonableness),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// What happened when a check met a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    MissingInput,
    NotApplicable,
    InternalError,
}

impl CheckStatus {
    /// Findings are everything that is neither a pass nor an exemption.
    pub fn is_finding(self) -> bool {
        !matches!(self, Self::Passed | Self::NotApplicable)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::MissingInput => "missing_input",
            Self::NotApplicable => "not_applicable",
            Self::InternalError => "internal_error",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one check on one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check_id: &'static str,
    pub check_name: &'static str,
    pub category: CheckCategory,
    pub period: String,
    pub severity: Severity,
    pub status: CheckStatus,
    pub passed: bool,
    pub message: String,
    pub observed_value: Option<f64>,
    pub expected_value: Option<f64>,
    pub delta: Option<f64>,
    pub relative_delta: Option<f64>,
}

impl CheckResult {
    pub fn is_finding(&self) -> bool {
        self.status.is_finding()
    }
}

/// What a check function returns for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: CheckStatus,
    /// Overrides the definition's default severity on failure.
    pub severity: Option<Severity>,
    pub message: String,
    pub observed: Option<f64>,
    pub expected: Option<f64>,
    pub delta: Option<f64>,
    pub relative_delta: Option<f64>,
}

impl Outcome {
    fn bare(status: CheckStatus, message: String) -> Self {
        Self {
            status,
            severity: None,
            message,
            observed: None,
            expected: None,
            delta: None,
            relative_delta: None,
        }
    }

    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::bare(CheckStatus::NotApplicable, reason.into())
    }

    /// Tolerance comparison of `observed` against `expected`.
    pub fn compare(tolerance: &Tolerance, what: &str, observed: f64, expected: f64) -> Self {
        let cmp = tolerance.compare(observed, expected);
        let message = if cmp.equal {
            format!("{what}: {observed:.2} matches {expected:.2}")
        } else {
            format!(
                "{what}: stated {observed:.2} vs computed {expected:.2} (delta {:.2})",
                cmp.delta
            )
        };
        Self {
            status: if cmp.equal {
                CheckStatus::Passed
            } else {
                CheckStatus::Failed
            },
            severity: None,
            message,
            observed: Some(observed),
            expected: Some(expected),
            delta: Some(cmp.delta),
            relative_delta: Some(cmp.relative_delta),
        }
    }

    /// Range test: `value` must lie in `[min, max]` (either bound optional).
    ///
    /// On failure, `expected` is the violated bound and `delta` the distance to it.
    pub fn within(what: &str, value: f64, min: Option<f64>, max: Option<f64>) -> Self {
        let violated = match (min, max) {
            (Some(lo), _) if value < lo => Some(lo),
            (_, Some(hi)) if value > hi => Some(hi),
            _ => None,
        };
        let range = match (min, max) {
            (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
            (Some(lo), None) => format!(">= {lo}"),
            (None, Some(hi)) => format!("<= {hi}"),
            (None, None) => "any".to_string(),
        };
        match violated {
            None => Self {
                observed: Some(value),
                ..Self::bare(CheckStatus::Passed, format!("{what} {value:.4} within {range}"))
            },
            Some(bound) => {
                let delta = (value - bound).abs();
                Self {
                    observed: Some(value),
                    expected: Some(bound),
                    delta: Some(delta),
                    relative_delta: Some(delta / bound.abs().max(value.abs()).max(1.0)),
                    ..Self::bare(
                        CheckStatus::Failed,
                        format!("{what} {value:.4} outside {range}"),
                    )
                }
            }
        }
    }

    pub fn pass(message: impl Into<String>, observed: Option<f64>) -> Self {
        Self {
            observed,
            ..Self::bare(CheckStatus::Passed, message.into())
        }
    }

    /// Failure with a custom message and no numeric comparison.
    pub fn fail(message: impl Into<String>, observed: Option<f64>) -> Self {
        Self {
            observed,
            ..Self::bare(CheckStatus::Failed, message.into())
        }
    }

    /// Set the failure severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    /// Fold several sub-tests into one outcome.
    ///
    /// Not-applicable parts are skipped; if every part is, the whole is not
    /// applicable. Otherwise the first failing part supplies the numbers, the
    /// highest escalated severity wins and the message lists every failure.
    pub fn combine(parts: Vec<Outcome>) -> Self {
        let applicable: Vec<Outcome> = parts
            .into_iter()
            .filter(|p| p.status != CheckStatus::NotApplicable)
            .collect();
        if applicable.is_empty() {
            return Self::not_applicable("no applicable sub-tests");
        }

        let failures: Vec<&Outcome> = applicable.iter().filter(|p| !p.passed()).collect();
        let Some(first) = failures.first() else {
            let message = applicable
                .iter()
                .map(|p| p.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Self {
                message,
                ..applicable[0].clone()
            };
        };

        let message = failures
            .iter()
            .map(|p| p.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let severity = failures.iter().filter_map(|p| p.severity).max();
        Self {
            message,
            severity,
            ..(*first).clone()
        }
    }
}

// ============================================================================
// Evaluation Context
// ============================================================================

/// Read access to the period under test, its predecessor and the run's
/// thresholds.
pub struct CheckContext<'a> {
    pub period: &'a Period,
    pub prior: Option<&'a Period>,
    /// Every period up to and including the current one, oldest first.
    pub history: &'a [Period],
    pub tolerance: Tolerance,
    pub thresholds: &'a ReasonablenessConfig,
}

impl<'a> CheckContext<'a> {
    /// A required value. The engine verifies presence before evaluation; a
    /// value that is still absent reads as NaN and surfaces as an internal
    /// error.
    pub fn value(&self, item: LineItem) -> f64 {
        self.period.get(item).unwrap_or(f64::NAN)
    }

    /// An optional value; absent reads as zero.
    pub fn optional(&self, item: LineItem) -> f64 {
        self.period.get(item).unwrap_or(0.0)
    }

    pub fn has(&self, item: LineItem) -> bool {
        self.period.get(item).is_some()
    }

    /// A required prior-period value.
    pub fn prior_value(&self, item: LineItem) -> f64 {
        self.prior.and_then(|p| p.get(item)).unwrap_or(f64::NAN)
    }

    /// An optional prior-period value; absent reads as zero.
    pub fn prior_optional(&self, item: LineItem) -> f64 {
        self.prior.and_then(|p| p.get(item)).unwrap_or(0.0)
    }

    pub fn prior_has(&self, item: LineItem) -> bool {
        self.prior.and_then(|p| p.get(item)).is_some()
    }

    /// Sum of whichever of `items` are present.
    pub fn sum_present(&self, items: &[LineItem]) -> f64 {
        items.iter().filter_map(|item| self.period.get(*item)).sum()
    }

    pub fn any_present(&self, items: &[LineItem]) -> bool {
        items.iter().any(|item| self.has(*item))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// One variant per check id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    BalanceSheetBalances,
    TotalAssetsSummation,
    TotalLiabilitiesSummation,
    LiabilitiesEquitySummation,
    GrossProfit,
    Ebit,
    Ebt,
    NetIncome,
    CashReconciliation,
    NetChangeInCash,
    CfoBuildUp,
    NetPpe,
    CurrentAssetsBreakdown,
    CurrentLiabilitiesBreakdown,
    EquityBreakdown,
    NetIncomeLinkage,
    RetainedEarningsRollforward,
    EndingCashLinkage,
    CashContinuity,
    DaLinkage,
    PpeRollforward,
    DebtRollforward,
    InterestVsAverageDebt,
    WorkingCapitalDeltas,
    EffectiveTaxRate,
    MarginDrift,
    RevenueGrowth,
    Leverage,
    WorkingCapitalDays,
    NegativeBalances,
    CapexIntensity,
    FreeCashFlow,
}

impl CheckKind {
    /// Run the check's arithmetic for one period.
    pub fn evaluate(self, ctx: &CheckContext<'_>) -> Outcome {
        use CheckKind::*;
        match self {
            BalanceSheetBalances => structural::balance_sheet_balances(ctx),
            TotalAssetsSummation => structural::total_assets_summation(ctx),
            TotalLiabilitiesSummation => structural::total_liabilities_summation(ctx),
            LiabilitiesEquitySummation => structural::liabilities_equity_summation(ctx),
            GrossProfit => structural::gross_profit(ctx),
            Ebit => structural::ebit(ctx),
            Ebt => structural::ebt(ctx),
            NetIncome => structural::net_income(ctx),
            CashReconciliation => structural::cash_reconciliation(ctx),
            NetChangeInCash => structural::net_change_in_cash(ctx),
            CfoBuildUp => structural::cfo_build_up(ctx),
            NetPpe => structural::net_ppe(ctx),
            CurrentAssetsBreakdown => structural::current_assets_breakdown(ctx),
            CurrentLiabilitiesBreakdown => structural::current_liabilities_breakdown(ctx),
            EquityBreakdown => structural::equity_breakdown(ctx),
            NetIncomeLinkage => cross_statement::net_income_linkage(ctx),
            RetainedEarningsRollforward => cross_statement::retained_earnings_rollforward(ctx),
            EndingCashLinkage => cross_statement::ending_cash_linkage(ctx),
            CashContinuity => cross_statement::cash_continuity(ctx),
            DaLinkage => cross_statement::da_linkage(ctx),
            PpeRollforward => cross_statement::ppe_rollforward(ctx),
            DebtRollforward => cross_statement::debt_rollforward(ctx),
            InterestVsAverageDebt => cross_statement::interest_vs_average_debt(ctx),
            WorkingCapitalDeltas => cross_statement::working_capital_deltas(ctx),
            EffectiveTaxRate => cross_statement::effective_tax_rate(ctx),
            MarginDrift => reasonableness::margin_drift(ctx),
            RevenueGrowth => reasonableness::revenue_growth(ctx),
            Leverage => reasonableness::leverage(ctx),
            WorkingCapitalDays => reasonableness::working_capital_days(ctx),
            NegativeBalances => reasonableness::negative_balances(ctx),
            CapexIntensity => reasonableness::capex_intensity(ctx),
            FreeCashFlow => reasonableness::free_cash_flow(ctx),
        }
    }
}

/// Static description of a check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: CheckCategory,
    pub severity_default: Severity,
    /// Current-period line items without which the check cannot run.
    pub required_keys: &'static [LineItem],
    /// Line items read from the previous period. Non-empty means the first
    /// period is exempt.
    pub prior_keys: &'static [LineItem],
    /// Line items used when present.
    pub optional_keys: &'static [LineItem],
    pub description: &'static str,
    #[serde(skip)]
    pub kind: CheckKind,
}

impl CheckDefinition {
    pub fn is_rollforward(&self) -> bool {
        !self.prior_keys.is_empty()
    }
}

use CheckCategory::{CrossStatement, Reasonableness, Structural};
use LineItem as L;

/// Every check, ordered by category then id.
pub static REGISTRY: [CheckDefinition; 32] = [
    // Structural
    CheckDefinition {
        id: "STR-001",
        name: "Balance sheet balances",
        category: Structural,
        severity_default: Severity::Critical,
        required_keys: &[L::TotalAssets, L::TotalLiabilities, L::TotalEquity],
        prior_keys: &[],
        optional_keys: &[],
        description: "total_assets = total_liabilities + total_equity",
        kind: CheckKind::BalanceSheetBalances,
    },
    CheckDefinition {
        id: "STR-002",
        name: "Total assets summation",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalAssets, L::TotalCurrentAssets, L::TotalNonCurrentAssets],
        prior_keys: &[],
        optional_keys: &[],
        description: "total_assets = total_current_assets + total_non_current_assets",
        kind: CheckKind::TotalAssetsSummation,
    },
    CheckDefinition {
        id: "STR-003",
        name: "Total liabilities summation",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalLiabilities, L::TotalCurrentLiabilities, L::TotalNonCurrentLiabilities],
        prior_keys: &[],
        optional_keys: &[],
        description: "total_liabilities = total_current_liabilities + total_non_current_liabilities",
        kind: CheckKind::TotalLiabilitiesSummation,
    },
    CheckDefinition {
        id: "STR-004",
        name: "Liabilities + equity summation",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalLiabilitiesAndEquity, L::TotalLiabilities, L::TotalEquity],
        prior_keys: &[],
        optional_keys: &[],
        description: "total_liabilities_and_equity = total_liabilities + total_equity",
        kind: CheckKind::LiabilitiesEquitySummation,
    },
    CheckDefinition {
        id: "STR-010",
        name: "Gross profit",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::GrossProfit, L::Revenue, L::Cogs],
        prior_keys: &[],
        optional_keys: &[],
        description: "gross_profit = revenue - cogs",
        kind: CheckKind::GrossProfit,
    },
    CheckDefinition {
        id: "STR-011",
        name: "EBIT",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::Ebit, L::GrossProfit],
        prior_keys: &[],
        optional_keys: &[L::TotalOpex, L::Sga, L::Rd, L::Depreciation, L::Amortization, L::OtherOpex],
        description: "ebit = gross_profit - total_opex (or minus the operating expense lines present)",
        kind: CheckKind::Ebit,
    },
    CheckDefinition {
        id: "STR-012",
        name: "EBT",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::Ebt, L::Ebit],
        prior_keys: &[],
        optional_keys: &[L::InterestExpense, L::InterestIncome, L::OtherIncomeExpense],
        description: "ebt = ebit - interest_expense + interest_income + other_income_expense",
        kind: CheckKind::Ebt,
    },
    CheckDefinition {
        id: "STR-013",
        name: "Net income",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::NetIncome, L::Ebt, L::TaxExpense],
        prior_keys: &[],
        optional_keys: &[],
        description: "net_income = ebt - tax_expense",
        kind: CheckKind::NetIncome,
    },
    CheckDefinition {
        id: "STR-020",
        name: "Cash reconciliation",
        category: Structural,
        severity_default: Severity::Critical,
        required_keys: &[L::EndingCash, L::BeginningCash, L::NetChangeInCash],
        prior_keys: &[],
        optional_keys: &[],
        description: "ending_cash = beginning_cash + net_change_in_cash",
        kind: CheckKind::CashReconciliation,
    },
    CheckDefinition {
        id: "STR-021",
        name: "Net change in cash",
        category: Structural,
        severity_default: Severity::Critical,
        required_keys: &[L::NetChangeInCash, L::CashFromOperations, L::CashFromInvesting, L::CashFromFinancing],
        prior_keys: &[],
        optional_keys: &[],
        description: "net_change_in_cash = cash_from_operations + cash_from_investing + cash_from_financing",
        kind: CheckKind::NetChangeInCash,
    },
    CheckDefinition {
        id: "STR-022",
        name: "CFO build-up",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::CashFromOperations, L::CfNetIncome],
        prior_keys: &[],
        optional_keys: &[
            L::DepreciationAmortization,
            L::StockBasedCompensation,
            L::DeferredTaxes,
            L::ChangeInReceivables,
            L::ChangeInInventory,
            L::ChangeInPayables,
            L::ChangeInOtherWorkingCapital,
            L::OtherOperating,
        ],
        description: "cash_from_operations = net_income + non-cash items + working-capital changes",
        kind: CheckKind::CfoBuildUp,
    },
    CheckDefinition {
        id: "STR-030",
        name: "Net PP&E",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::PpeNet, L::PpeGross, L::AccumulatedDepreciation],
        prior_keys: &[],
        optional_keys: &[],
        description: "ppe_net = ppe_gross - accumulated_depreciation",
        kind: CheckKind::NetPpe,
    },
    CheckDefinition {
        id: "STR-031",
        name: "Current assets breakdown",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalCurrentAssets, L::Cash],
        prior_keys: &[],
        optional_keys: &[
            L::ShortTermInvestments,
            L::AccountsReceivable,
            L::Inventory,
            L::PrepaidExpenses,
            L::OtherCurrentAssets,
        ],
        description: "total_current_assets = cash + the current asset lines present",
        kind: CheckKind::CurrentAssetsBreakdown,
    },
    CheckDefinition {
        id: "STR-032",
        name: "Current liabilities breakdown",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalCurrentLiabilities, L::AccountsPayable],
        prior_keys: &[],
        optional_keys: &[
            L::AccruedLiabilities,
            L::ShortTermDebt,
            L::CurrentPortionLtd,
            L::OtherCurrentLiabilities,
        ],
        description: "total_current_liabilities = accounts_payable + the current liability lines present",
        kind: CheckKind::CurrentLiabilitiesBreakdown,
    },
    CheckDefinition {
        id: "STR-033",
        name: "Equity breakdown",
        category: Structural,
        severity_default: Severity::Error,
        required_keys: &[L::TotalEquity, L::RetainedEarnings],
        prior_keys: &[],
        optional_keys: &[
            L::CommonStock,
            L::AdditionalPaidInCapital,
            L::TreasuryStock,
            L::AccumulatedOtherComprehensiveIncome,
        ],
        description: "total_equity = retained_earnings + the equity lines present (treasury stock negative)",
        kind: CheckKind::EquityBreakdown,
    },
    // Cross-statement
    CheckDefinition {
        id: "XST-001",
        name: "Net income linkage",
        category: CrossStatement,
        severity_default: Severity::Critical,
        required_keys: &[L::NetIncome, L::CfNetIncome],
        prior_keys: &[],
        optional_keys: &[],
        description: "income statement net_income = cash flow net_income",
        kind: CheckKind::NetIncomeLinkage,
    },
    CheckDefinition {
        id: "XST-002",
        name: "Retained earnings rollforward",
        category: CrossStatement,
        severity_default: Severity::Error,
        required_keys: &[L::RetainedEarnings, L::NetIncome],
        prior_keys: &[L::RetainedEarnings],
        optional_keys: &[L::DividendsPaid],
        description: "retained_earnings = prior retained_earnings + net_income + dividends_paid (dividends negative)",
        kind: CheckKind::RetainedEarningsRollforward,
    },
    CheckDefinition {
        id: "XST-003",
        name: "Ending cash linkage",
        category: CrossStatement,
        severity_default: Severity::Critical,
        required_keys: &[L::EndingCash, L::Cash],
        prior_keys: &[],
        optional_keys: &[],
        description: "cash flow ending_cash = balance sheet cash",
        kind: CheckKind::EndingCashLinkage,
    },
    CheckDefinition {
        id: "XST-004",
        name: "Cash continuity",
        category: CrossStatement,
        severity_default: Severity::Critical,
        required_keys: &[L::BeginningCash],
        prior_keys: &[L::EndingCash],
        optional_keys: &[],
        description: "beginning_cash = prior ending_cash",
        kind: CheckKind::CashContinuity,
    },
    CheckDefinition {
        id: "XST-005",
        name: "D&A linkage",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[L::DepreciationAmortization, L::Depreciation],
        prior_keys: &[],
        optional_keys: &[L::Amortization],
        description: "income statement depreciation + amortization = cash flow depreciation_amortization",
        kind: CheckKind::DaLinkage,
    },
    CheckDefinition {
        id: "XST-006",
        name: "PP&E rollforward",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[L::PpeNet, L::Capex, L::DepreciationAmortization],
        prior_keys: &[L::PpeNet],
        optional_keys: &[L::AssetSales],
        description: "ppe_net = prior ppe_net - capex - depreciation_amortization - asset_sales (capex negative)",
        kind: CheckKind::PpeRollforward,
    },
    CheckDefinition {
        id: "XST-007",
        name: "Debt rollforward",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[L::LongTermDebt],
        prior_keys: &[L::LongTermDebt],
        optional_keys: &[L::ShortTermDebt, L::CurrentPortionLtd, L::DebtIssuance, L::DebtRepayment],
        description: "debt = prior debt + debt_issuance + debt_repayment (repayment negative)",
        kind: CheckKind::DebtRollforward,
    },
    CheckDefinition {
        id: "XST-008",
        name: "Interest vs average debt",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[L::InterestExpense, L::LongTermDebt],
        prior_keys: &[L::LongTermDebt],
        optional_keys: &[L::ShortTermDebt, L::CurrentPortionLtd],
        description: "interest_expense / average debt within the configured rate band",
        kind: CheckKind::InterestVsAverageDebt,
    },
    CheckDefinition {
        id: "XST-009",
        name: "Working-capital deltas",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[
            L::AccountsReceivable,
            L::AccountsPayable,
            L::ChangeInReceivables,
            L::ChangeInPayables,
        ],
        prior_keys: &[L::AccountsReceivable, L::AccountsPayable],
        optional_keys: &[L::Inventory, L::ChangeInInventory],
        description: "-delta AR = change_in_receivables, -delta inventory = change_in_inventory, delta AP = change_in_payables",
        kind: CheckKind::WorkingCapitalDeltas,
    },
    CheckDefinition {
        id: "XST-010",
        name: "Effective tax rate",
        category: CrossStatement,
        severity_default: Severity::Warning,
        required_keys: &[L::TaxExpense, L::Ebt],
        prior_keys: &[],
        optional_keys: &[],
        description: "tax_expense / ebt within the configured band",
        kind: CheckKind::EffectiveTaxRate,
    },
    // Reasonableness
    CheckDefinition {
        id: "RSN-001",
        name: "Margin drift",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::Revenue, L::GrossProfit],
        prior_keys: &[L::Revenue, L::GrossProfit],
        optional_keys: &[L::Ebit, L::NetIncome],
        description: "period-over-period change in gross, EBIT and net margin within the drift threshold",
        kind: CheckKind::MarginDrift,
    },
    CheckDefinition {
        id: "RSN-002",
        name: "Revenue growth",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::Revenue],
        prior_keys: &[L::Revenue],
        optional_keys: &[],
        description: "revenue growth within the configured band; error at 100% or more either way",
        kind: CheckKind::RevenueGrowth,
    },
    CheckDefinition {
        id: "RSN-003",
        name: "Leverage & coverage",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::TotalEquity],
        prior_keys: &[],
        optional_keys: &[
            L::ShortTermDebt,
            L::CurrentPortionLtd,
            L::LongTermDebt,
            L::Ebitda,
            L::Ebit,
            L::Depreciation,
            L::Amortization,
            L::InterestExpense,
        ],
        description: "debt/equity and debt/EBITDA under their ceilings, EBIT covering interest expense",
        kind: CheckKind::Leverage,
    },
    CheckDefinition {
        id: "RSN-004",
        name: "Working-capital days",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::Revenue, L::AccountsReceivable],
        prior_keys: &[L::AccountsReceivable],
        optional_keys: &[L::Cogs, L::Inventory, L::AccountsPayable],
        description: "DSO, DIO and DPO from average balances under their ceilings",
        kind: CheckKind::WorkingCapitalDays,
    },
    CheckDefinition {
        id: "RSN-005",
        name: "Negative balances",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::Cash],
        prior_keys: &[],
        optional_keys: &[
            L::TotalAssets,
            L::Revenue,
            L::AccountsReceivable,
            L::Inventory,
            L::AccountsPayable,
            L::Cogs,
        ],
        description: "balances that cannot be negative are not negative",
        kind: CheckKind::NegativeBalances,
    },
    CheckDefinition {
        id: "RSN-006",
        name: "CapEx intensity",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::Revenue, L::Capex],
        prior_keys: &[],
        optional_keys: &[],
        description: "|capex| / revenue under the configured ceiling",
        kind: CheckKind::CapexIntensity,
    },
    CheckDefinition {
        id: "RSN-007",
        name: "Free cash flow",
        category: Reasonableness,
        severity_default: Severity::Warning,
        required_keys: &[L::CashFromOperations, L::Capex],
        prior_keys: &[],
        optional_keys: &[L::FreeCashFlow],
        description: "stated free_cash_flow = cash_from_operations + capex; flags a run of negative FCF periods",
        kind: CheckKind::FreeCashFlow,
    },
];

/// All check definitions, in reporting order.
pub fn registry() -> &'static [CheckDefinition] {
    &REGISTRY
}

/// Look up a check by id (case-insensitive).
pub fn find(id: &str) -> Option<&'static CheckDefinition> {
    REGISTRY.iter().find(|def| def.id.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by the check unit tests.

    use super::*;

    pub fn ctx<'a>(
        history: &'a [Period],
        thresholds: &'a ReasonablenessConfig,
    ) -> CheckContext<'a> {
        let n = history.len();
        CheckContext {
            period: &history[n - 1],
            prior: if n > 1 { Some(&history[n - 2]) } else { None },
            history,
            tolerance: Tolerance::default(),
            thresholds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_counts() {
        let count = |c| REGISTRY.iter().filter(|d| d.category == c).count();
        assert_eq!(REGISTRY.len(), 32);
        assert_eq!(count(Structural), 15);
        assert_eq!(count(CrossStatement), 10);
        assert_eq!(count(Reasonableness), 7);
    }

    #[test]
    fn test_registry_ordered_and_unique() {
        let ids: HashSet<_> = REGISTRY.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), 32);
        for pair in REGISTRY.windows(2) {
            assert!(
                (pair[0].category, pair[0].id) < (pair[1].category, pair[1].id),
                "{} before {}",
                pair[0].id,
                pair[1].id
            );
        }
        let kinds: HashSet<_> = REGISTRY.iter().map(|d| d.kind).collect();
        assert_eq!(kinds.len(), 32);
    }

    #[test]
    fn test_find() {
        assert_eq!(find("str-001").map(|d| d.kind), Some(CheckKind::BalanceSheetBalances));
        assert!(find("STR-999").is_none());
    }

    #[test]
    fn test_severity_order_and_parse() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("cross-statement".parse::<CheckCategory>(), Ok(CrossStatement));
    }

    #[test]
    fn test_within_outcome() {
        let ok = Outcome::within("ratio", 0.2, Some(0.0), Some(0.4));
        assert!(ok.passed());
        let high = Outcome::within("ratio", 0.5, Some(0.0), Some(0.4));
        assert_eq!(high.status, CheckStatus::Failed);
        assert_eq!(high.expected, Some(0.4));
        assert!((high.delta.unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_combine() {
        let tol = Tolerance::default();
        let pass = Outcome::compare(&tol, "a", 1.0, 1.0);
        let warn = Outcome::compare(&tol, "b", 10.0, 1.0);
        let err = Outcome::compare(&tol, "c", 5.0, 1.0).with_severity(Severity::Error);

        let all_pass = Outcome::combine(vec![pass.clone(), Outcome::not_applicable("x")]);
        assert!(all_pass.passed());

        let mixed = Outcome::combine(vec![pass, warn, err]);
        assert_eq!(mixed.status, CheckStatus::Failed);
        assert_eq!(mixed.severity, Some(Severity::Error));
        assert_eq!(mixed.observed, Some(10.0));
        assert!(mixed.message.starts_with("b:") && mixed.message.contains("; c:"));

        let none = Outcome::combine(vec![Outcome::not_applicable("x")]);
        assert_eq!(none.status, CheckStatus::NotApplicable);
    }
}
