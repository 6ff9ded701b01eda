//! Cross-statement checks: the three statements agree with each other and
//! with the previous period.

use super::{CheckContext, Outcome};
use crate::model::LineItem as L;

const DEBT_ITEMS: &[L] = &[L::ShortTermDebt, L::CurrentPortionLtd, L::LongTermDebt];

fn total_debt(ctx: &CheckContext<'_>) -> f64 {
    ctx.sum_present(DEBT_ITEMS)
}

fn prior_total_debt(ctx: &CheckContext<'_>) -> f64 {
    DEBT_ITEMS.iter().map(|item| ctx.prior_optional(*item)).sum()
}

pub fn net_income_linkage(ctx: &CheckContext<'_>) -> Outcome {
    Outcome::compare(
        &ctx.tolerance,
        "cash flow net income",
        ctx.value(L::CfNetIncome),
        ctx.value(L::NetIncome),
    )
}

/// Dividends are read from the cash flow statement, where they are negative.
pub fn retained_earnings_rollforward(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.prior_value(L::RetainedEarnings)
        + ctx.value(L::NetIncome)
        + ctx.optional(L::DividendsPaid);
    Outcome::compare(
        &ctx.tolerance,
        "retained earnings",
        ctx.value(L::RetainedEarnings),
        expected,
    )
}

pub fn ending_cash_linkage(ctx: &CheckContext<'_>) -> Outcome {
    Outcome::compare(
        &ctx.tolerance,
        "cash flow ending cash",
        ctx.value(L::EndingCash),
        ctx.value(L::Cash),
    )
}

pub fn cash_continuity(ctx: &CheckContext<'_>) -> Outcome {
    Outcome::compare(
        &ctx.tolerance,
        "beginning cash",
        ctx.value(L::BeginningCash),
        ctx.prior_value(L::EndingCash),
    )
}

pub fn da_linkage(ctx: &CheckContext<'_>) -> Outcome {
    let income_side = ctx.value(L::Depreciation) + ctx.optional(L::Amortization);
    Outcome::compare(
        &ctx.tolerance,
        "cash flow D&A",
        ctx.value(L::DepreciationAmortization),
        income_side,
    )
}

/// Capex is negative on the cash flow statement, so subtracting it adds the
/// spend back. Asset sales are positive proceeds.
pub fn ppe_rollforward(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.prior_value(L::PpeNet)
        - ctx.value(L::Capex)
        - ctx.value(L::DepreciationAmortization)
        - ctx.optional(L::AssetSales);
    Outcome::compare(&ctx.tolerance, "net PP&E", ctx.value(L::PpeNet), expected)
}

pub fn debt_rollforward(ctx: &CheckContext<'_>) -> Outcome {
    let expected =
        prior_total_debt(ctx) + ctx.optional(L::DebtIssuance) + ctx.optional(L::DebtRepayment);
    Outcome::compare(&ctx.tolerance, "total debt", total_debt(ctx), expected)
}

pub fn interest_vs_average_debt(ctx: &CheckContext<'_>) -> Outcome {
    let average = (total_debt(ctx) + prior_total_debt(ctx)) / 2.0;
    let interest = ctx.value(L::InterestExpense);
    if average <= 0.0 {
        return Outcome::not_applicable("no average debt outstanding");
    }
    if interest <= 0.0 {
        return Outcome::not_applicable("no interest expense");
    }
    let band = &ctx.thresholds;
    Outcome::within(
        "implied interest rate",
        interest / average,
        Some(band.interest_rate_min),
        Some(band.interest_rate_max),
    )
}

/// Cash-flow changes follow the cash convention: an increase in receivables
/// or inventory is a negative change, an increase in payables a positive one.
/// The inventory leg needs inventory in both periods and a reported change.
pub fn working_capital_deltas(ctx: &CheckContext<'_>) -> Outcome {
    let tol = &ctx.tolerance;
    let mut parts = vec![
        Outcome::compare(
            tol,
            "change in receivables",
            ctx.value(L::ChangeInReceivables),
            -(ctx.value(L::AccountsReceivable) - ctx.prior_value(L::AccountsReceivable)),
        ),
        Outcome::compare(
            tol,
            "change in payables",
            ctx.value(L::ChangeInPayables),
            ctx.value(L::AccountsPayable) - ctx.prior_value(L::AccountsPayable),
        ),
    ];
    if ctx.has(L::Inventory) && ctx.prior_has(L::Inventory) && ctx.has(L::ChangeInInventory) {
        parts.insert(
            1,
            Outcome::compare(
                tol,
                "change in inventory",
                ctx.value(L::ChangeInInventory),
                -(ctx.value(L::Inventory) - ctx.prior_value(L::Inventory)),
            ),
        );
    }
    Outcome::combine(parts)
}

pub fn effective_tax_rate(ctx: &CheckContext<'_>) -> Outcome {
    let ebt = ctx.value(L::Ebt);
    if ebt == 0.0 {
        return Outcome::not_applicable("EBT is zero");
    }
    let band = &ctx.thresholds;
    Outcome::within(
        "effective tax rate",
        ctx.value(L::TaxExpense) / ebt,
        Some(band.tax_rate_min),
        Some(band.tax_rate_max),
    )
}
