//! Structural checks: each statement adds up on its own.
//!
//! Sign conventions: expenses on the income statement are positive amounts,
//! accumulated depreciation is a positive contra balance, treasury stock is
//! carried negative.

use super::{CheckContext, Outcome};
use crate::model::LineItem as L;

const OPEX_COMPONENTS: &[L] = &[L::Sga, L::Rd, L::Depreciation, L::Amortization, L::OtherOpex];

const CFO_COMPONENTS: &[L] = &[
    L::DepreciationAmortization,
    L::StockBasedCompensation,
    L::DeferredTaxes,
    L::ChangeInReceivables,
    L::ChangeInInventory,
    L::ChangeInPayables,
    L::ChangeInOtherWorkingCapital,
    L::OtherOperating,
];

const CURRENT_ASSET_COMPONENTS: &[L] = &[
    L::ShortTermInvestments,
    L::AccountsReceivable,
    L::Inventory,
    L::PrepaidExpenses,
    L::OtherCurrentAssets,
];

const CURRENT_LIABILITY_COMPONENTS: &[L] = &[
    L::AccruedLiabilities,
    L::ShortTermDebt,
    L::CurrentPortionLtd,
    L::OtherCurrentLiabilities,
];

const EQUITY_COMPONENTS: &[L] = &[
    L::CommonStock,
    L::AdditionalPaidInCapital,
    L::TreasuryStock,
    L::AccumulatedOtherComprehensiveIncome,
];

// ============================================================================
// Balance Sheet
// ============================================================================

pub fn balance_sheet_balances(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::TotalLiabilities) + ctx.value(L::TotalEquity);
    Outcome::compare(&ctx.tolerance, "total assets", ctx.value(L::TotalAssets), expected)
}

pub fn total_assets_summation(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::TotalCurrentAssets) + ctx.value(L::TotalNonCurrentAssets);
    Outcome::compare(&ctx.tolerance, "total assets", ctx.value(L::TotalAssets), expected)
}

pub fn total_liabilities_summation(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::TotalCurrentLiabilities) + ctx.value(L::TotalNonCurrentLiabilities);
    Outcome::compare(
        &ctx.tolerance,
        "total liabilities",
        ctx.value(L::TotalLiabilities),
        expected,
    )
}

pub fn liabilities_equity_summation(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::TotalLiabilities) + ctx.value(L::TotalEquity);
    Outcome::compare(
        &ctx.tolerance,
        "total liabilities and equity",
        ctx.value(L::TotalLiabilitiesAndEquity),
        expected,
    )
}

pub fn net_ppe(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::PpeGross) - ctx.value(L::AccumulatedDepreciation);
    Outcome::compare(&ctx.tolerance, "net PP&E", ctx.value(L::PpeNet), expected)
}

pub fn current_assets_breakdown(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::Cash) + ctx.sum_present(CURRENT_ASSET_COMPONENTS);
    Outcome::compare(
        &ctx.tolerance,
        "total current assets",
        ctx.value(L::TotalCurrentAssets),
        expected,
    )
}

pub fn current_liabilities_breakdown(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::AccountsPayable) + ctx.sum_present(CURRENT_LIABILITY_COMPONENTS);
    Outcome::compare(
        &ctx.tolerance,
        "total current liabilities",
        ctx.value(L::TotalCurrentLiabilities),
        expected,
    )
}

pub fn equity_breakdown(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::RetainedEarnings) + ctx.sum_present(EQUITY_COMPONENTS);
    Outcome::compare(&ctx.tolerance, "total equity", ctx.value(L::TotalEquity), expected)
}

// ============================================================================
// Income Statement
// ============================================================================

pub fn gross_profit(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::Revenue) - ctx.value(L::Cogs);
    Outcome::compare(&ctx.tolerance, "gross profit", ctx.value(L::GrossProfit), expected)
}

/// Uses `total_opex` when stated, otherwise the operating expense lines
/// that are present.
pub fn ebit(ctx: &CheckContext<'_>) -> Outcome {
    let opex = if ctx.has(L::TotalOpex) {
        ctx.value(L::TotalOpex)
    } else if ctx.any_present(OPEX_COMPONENTS) {
        ctx.sum_present(OPEX_COMPONENTS)
    } else {
        return Outcome::not_applicable("no operating expense lines");
    };
    let expected = ctx.value(L::GrossProfit) - opex;
    Outcome::compare(&ctx.tolerance, "EBIT", ctx.value(L::Ebit), expected)
}

pub fn ebt(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::Ebit) - ctx.optional(L::InterestExpense)
        + ctx.optional(L::InterestIncome)
        + ctx.optional(L::OtherIncomeExpense);
    Outcome::compare(&ctx.tolerance, "EBT", ctx.value(L::Ebt), expected)
}

pub fn net_income(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::Ebt) - ctx.value(L::TaxExpense);
    Outcome::compare(&ctx.tolerance, "net income", ctx.value(L::NetIncome), expected)
}

// ============================================================================
// Cash Flow Statement
// ============================================================================

pub fn cash_reconciliation(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::BeginningCash) + ctx.value(L::NetChangeInCash);
    Outcome::compare(&ctx.tolerance, "ending cash", ctx.value(L::EndingCash), expected)
}

pub fn net_change_in_cash(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::CashFromOperations)
        + ctx.value(L::CashFromInvesting)
        + ctx.value(L::CashFromFinancing);
    Outcome::compare(
        &ctx.tolerance,
        "net change in cash",
        ctx.value(L::NetChangeInCash),
        expected,
    )
}

pub fn cfo_build_up(ctx: &CheckContext<'_>) -> Outcome {
    let expected = ctx.value(L::CfNetIncome) + ctx.sum_present(CFO_COMPONENTS);
    Outcome::compare(
        &ctx.tolerance,
        "cash from operations",
        ctx.value(L::CashFromOperations),
        expected,
    )
}
