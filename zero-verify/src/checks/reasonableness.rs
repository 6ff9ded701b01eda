//! Reasonableness checks: plausibility bands on ratios and trends.
//!
//! None of these prove a model wrong; they flag numbers an analyst should
//! look at twice. Every threshold lives in [`ReasonablenessConfig`].

use serde::{Deserialize, Serialize};
use zero_common::validation::non_negative;
use zero_common::{Validate, ValidationError, ValidationResult};

use super::{CheckContext, Outcome, Severity};
use crate::model::{LineItem as L, Period};

// ============================================================================
// Thresholds
// ============================================================================

/// Thresholds for the reasonableness checks and the ratio bands of XST-008
/// and XST-010.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReasonablenessConfig {
    pub revenue_growth_min: f64,
    pub revenue_growth_max: f64,
    /// Growth at or beyond this magnitude, either direction, is an error.
    pub revenue_growth_error: f64,
    pub margin_drift_warning: f64,
    pub margin_drift_error: f64,
    pub max_debt_to_equity: f64,
    pub max_debt_to_ebitda: f64,
    /// EBIT / interest expense below this is an error.
    pub min_interest_coverage: f64,
    pub max_dso: f64,
    pub max_dio: f64,
    pub max_dpo: f64,
    /// Days per period for DSO/DIO/DPO.
    pub days_in_period: f64,
    pub max_capex_intensity: f64,
    /// Consecutive negative free-cash-flow periods that trigger RSN-007.
    pub negative_fcf_streak: usize,
    pub interest_rate_min: f64,
    pub interest_rate_max: f64,
    pub tax_rate_min: f64,
    pub tax_rate_max: f64,
}

impl Default for ReasonablenessConfig {
    fn default() -> Self {
        Self {
            revenue_growth_min: -0.30,
            revenue_growth_max: 0.50,
            revenue_growth_error: 1.0,
            margin_drift_warning: 0.05,
            margin_drift_error: 0.15,
            max_debt_to_equity: 3.0,
            max_debt_to_ebitda: 8.0,
            min_interest_coverage: 1.0,
            max_dso: 180.0,
            max_dio: 365.0,
            max_dpo: 180.0,
            days_in_period: 365.0,
            max_capex_intensity: 0.40,
            negative_fcf_streak: 3,
            interest_rate_min: 0.005,
            interest_rate_max: 0.15,
            tax_rate_min: -0.05,
            tax_rate_max: 0.50,
        }
    }
}

impl Validate for ReasonablenessConfig {
    fn validate(&self) -> ValidationResult<()> {
        const PREFIX: &str = "verification.reasonableness";
        let mut errors = Vec::new();

        let positive = [
            ("revenue_growth_error", self.revenue_growth_error),
            ("margin_drift_warning", self.margin_drift_warning),
            ("margin_drift_error", self.margin_drift_error),
            ("max_debt_to_equity", self.max_debt_to_equity),
            ("max_debt_to_ebitda", self.max_debt_to_ebitda),
            ("min_interest_coverage", self.min_interest_coverage),
            ("max_dso", self.max_dso),
            ("max_dio", self.max_dio),
            ("max_dpo", self.max_dpo),
            ("days_in_period", self.days_in_period),
            ("max_capex_intensity", self.max_capex_intensity),
        ];
        for (name, value) in positive {
            if let Err(e) = non_negative(&format!("{PREFIX}.{name}"), value) {
                errors.push(e);
            }
        }
        if self.days_in_period == 0.0 {
            errors.push(ValidationError::invalid(
                format!("{PREFIX}.days_in_period"),
                "must be greater than zero",
            ));
        }
        if self.negative_fcf_streak == 0 {
            errors.push(ValidationError::invalid(
                format!("{PREFIX}.negative_fcf_streak"),
                "must be at least 1",
            ));
        }

        let bands = [
            ("revenue_growth", self.revenue_growth_min, self.revenue_growth_max),
            ("margin_drift", self.margin_drift_warning, self.margin_drift_error),
            ("interest_rate", self.interest_rate_min, self.interest_rate_max),
            ("tax_rate", self.tax_rate_min, self.tax_rate_max),
        ];
        for (name, low, high) in bands {
            if !low.is_finite() || !high.is_finite() {
                errors.push(ValidationError::invalid(
                    format!("{PREFIX}.{name}"),
                    "bounds must be finite",
                ));
            } else if low > high {
                errors.push(ValidationError::Conflict {
                    reason: format!("{PREFIX}.{name}: lower bound {low} exceeds upper bound {high}"),
                });
            }
        }

        ValidationError::collect(errors)
    }
}

// ============================================================================
// Checks
// ============================================================================

fn margin(numerator: f64, revenue: f64) -> f64 {
    numerator / revenue
}

pub fn margin_drift(ctx: &CheckContext<'_>) -> Outcome {
    let revenue = ctx.value(L::Revenue);
    let prior_revenue = ctx.prior_value(L::Revenue);
    if revenue == 0.0 || prior_revenue == 0.0 {
        return Outcome::not_applicable("revenue is zero");
    }

    let t = ctx.thresholds;
    let drift = |what: &str, item: L| -> Outcome {
        if !(ctx.has(item) && ctx.prior_has(item)) {
            return Outcome::not_applicable(format!("{what} not reported"));
        }
        let change = (margin(ctx.value(item), revenue) - margin(ctx.prior_value(item), prior_revenue)).abs();
        let outcome = Outcome::within(what, change, None, Some(t.margin_drift_warning));
        if change > t.margin_drift_error {
            outcome.with_severity(Severity::Error)
        } else {
            outcome
        }
    };

    Outcome::combine(vec![
        drift("gross margin drift", L::GrossProfit),
        drift("EBIT margin drift", L::Ebit),
        drift("net margin drift", L::NetIncome),
    ])
}

pub fn revenue_growth(ctx: &CheckContext<'_>) -> Outcome {
    let prior = ctx.prior_value(L::Revenue);
    if prior == 0.0 {
        return Outcome::not_applicable("prior revenue is zero");
    }
    let t = ctx.thresholds;
    let growth = (ctx.value(L::Revenue) - prior) / prior.abs();
    let outcome = Outcome::within(
        "revenue growth",
        growth,
        Some(t.revenue_growth_min),
        Some(t.revenue_growth_max),
    );
    if growth.abs() >= t.revenue_growth_error {
        outcome.with_severity(Severity::Error)
    } else {
        outcome
    }
}

/// Debt ratios when a debt line exists, plus interest coverage whenever
/// interest is charged.
pub fn leverage(ctx: &CheckContext<'_>) -> Outcome {
    let t = ctx.thresholds;
    let mut parts = Vec::new();
    if let Some(debt_parts) = debt_ratios(ctx) {
        parts.extend(debt_parts);
    }

    let interest = ctx.optional(L::InterestExpense);
    if ctx.has(L::Ebit) && interest > 0.0 {
        let coverage = ctx.value(L::Ebit) / interest;
        let outcome = Outcome::within("interest coverage", coverage, Some(t.min_interest_coverage), None);
        parts.push(if outcome.passed() {
            outcome
        } else {
            outcome.with_severity(Severity::Error)
        });
    }

    if parts.is_empty() {
        return Outcome::not_applicable("no debt or interest reported");
    }
    Outcome::combine(parts)
}

fn debt_ratios(ctx: &CheckContext<'_>) -> Option<Vec<Outcome>> {
    const DEBT: &[L] = &[L::ShortTermDebt, L::CurrentPortionLtd, L::LongTermDebt];
    if !ctx.any_present(DEBT) {
        return None;
    }
    let t = ctx.thresholds;
    let debt = ctx.sum_present(DEBT);
    let equity = ctx.value(L::TotalEquity);

    let mut parts = Vec::new();
    if equity <= 0.0 {
        if debt > 0.0 {
            parts.push(Outcome::fail(
                format!("equity {equity:.2} is not positive while debt is {debt:.2}"),
                Some(equity),
            ));
        }
    } else {
        parts.push(Outcome::within("debt/equity", debt / equity, None, Some(t.max_debt_to_equity)));
    }

    let ebitda = if ctx.has(L::Ebitda) {
        Some(ctx.value(L::Ebitda))
    } else if ctx.has(L::Ebit) {
        Some(ctx.value(L::Ebit) + ctx.optional(L::Depreciation) + ctx.optional(L::Amortization))
    } else {
        None
    };
    if let Some(ebitda) = ebitda.filter(|e| *e > 0.0) {
        parts.push(Outcome::within("debt/EBITDA", debt / ebitda, None, Some(t.max_debt_to_ebitda)));
    }

    if parts.is_empty() {
        parts.push(Outcome::pass("no debt outstanding", Some(debt)));
    }
    Some(parts)
}

/// Days ratios from the average of opening and closing balances.
pub fn working_capital_days(ctx: &CheckContext<'_>) -> Outcome {
    let revenue = ctx.value(L::Revenue);
    if revenue <= 0.0 {
        return Outcome::not_applicable("revenue is not positive");
    }
    let t = ctx.thresholds;
    let average = |item: L| (ctx.value(item) + ctx.prior_value(item)) / 2.0;
    let both = |item: L| ctx.has(item) && ctx.prior_has(item);

    let dso = average(L::AccountsReceivable) / revenue * t.days_in_period;
    let mut parts = vec![Outcome::within("DSO", dso, None, Some(t.max_dso))];

    let cogs = ctx.optional(L::Cogs);
    if cogs > 0.0 {
        if both(L::Inventory) {
            let dio = average(L::Inventory) / cogs * t.days_in_period;
            parts.push(Outcome::within("DIO", dio, None, Some(t.max_dio)));
        }
        if both(L::AccountsPayable) {
            let dpo = average(L::AccountsPayable) / cogs * t.days_in_period;
            parts.push(Outcome::within("DPO", dpo, None, Some(t.max_dpo)));
        }
    }
    Outcome::combine(parts)
}

pub fn negative_balances(ctx: &CheckContext<'_>) -> Outcome {
    const NON_NEGATIVE: &[L] = &[
        L::Cash,
        L::TotalAssets,
        L::Revenue,
        L::AccountsReceivable,
        L::Inventory,
        L::AccountsPayable,
        L::Cogs,
    ];
    let negatives: Vec<(L, f64)> = NON_NEGATIVE
        .iter()
        .filter_map(|item| ctx.period.get(*item).map(|v| (*item, v)))
        .filter(|(_, v)| ctx.tolerance.is_negative(*v))
        .collect();

    match negatives.first() {
        None => Outcome::pass("no negative balances", None),
        Some((_, first)) => {
            let listed = negatives
                .iter()
                .map(|(item, v)| format!("{item} {v:.2}"))
                .collect::<Vec<_>>()
                .join(", ");
            Outcome::fail(format!("negative balances: {listed}"), Some(*first))
        }
    }
}

pub fn capex_intensity(ctx: &CheckContext<'_>) -> Outcome {
    let revenue = ctx.value(L::Revenue);
    if revenue <= 0.0 {
        return Outcome::not_applicable("revenue is not positive");
    }
    let intensity = ctx.value(L::Capex).abs() / revenue;
    Outcome::within("capex intensity", intensity, None, Some(ctx.thresholds.max_capex_intensity))
}

fn computed_fcf(period: &Period) -> Option<f64> {
    Some(period.get(L::CashFromOperations)? + period.get(L::Capex)?)
}

/// Stated FCF must equal CFO + capex; a run of negative FCF is flagged.
pub fn free_cash_flow(ctx: &CheckContext<'_>) -> Outcome {
    let fcf = ctx.value(L::CashFromOperations) + ctx.value(L::Capex);
    let mut parts = Vec::new();

    if ctx.has(L::FreeCashFlow) {
        parts.push(
            Outcome::compare(&ctx.tolerance, "free cash flow", ctx.value(L::FreeCashFlow), fcf)
                .with_severity(Severity::Error),
        );
    }

    let streak = ctx
        .history
        .iter()
        .rev()
        .map_while(computed_fcf)
        .take_while(|value| ctx.tolerance.is_negative(*value))
        .count();
    let limit = ctx.thresholds.negative_fcf_streak;
    parts.push(if streak >= limit {
        Outcome::fail(
            format!("free cash flow negative for {streak} consecutive periods (limit {limit})"),
            Some(fcf),
        )
    } else {
        Outcome::pass(format!("free cash flow {fcf:.2}"), Some(fcf))
    });

    Outcome::combine(parts)
}
