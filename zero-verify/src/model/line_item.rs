//! Canonical line-item vocabulary.
//!
//! Every line item belongs to exactly one statement. `net_income` appears
//! twice: once on the income statement ([`LineItem::NetIncome`]) and once at
//! the top of the cash flow statement ([`LineItem::CfNetIncome`]). The two are
//! distinct keys that share a canonical name; XST-001 compares them.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The three financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatementKind {
    #[serde(rename = "income_statement")]
    Income,
    #[serde(rename = "balance_sheet")]
    Balance,
    #[serde(rename = "cash_flow")]
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    /// Section name used in mapping files and JSON input.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Income => "income_statement",
            Self::Balance => "balance_sheet",
            Self::CashFlow => "cash_flow",
        }
    }

    /// Human-readable title.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Income => "Income Statement",
            Self::Balance => "Balance Sheet",
            Self::CashFlow => "Cash Flow Statement",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! line_items {
    ($($variant:ident => ($name:literal, $statement:ident)),* $(,)?) => {
        /// A canonical line-item key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LineItem {
            $($variant),*
        }

        impl LineItem {
            /// Every line item, grouped by statement in presentation order.
            pub const ALL: &'static [LineItem] = &[$(LineItem::$variant),*];

            /// Canonical snake_case name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(LineItem::$variant => $name),*
                }
            }

            /// The statement this line item lives on.
            pub const fn statement(self) -> StatementKind {
                match self {
                    $(LineItem::$variant => StatementKind::$statement),*
                }
            }
        }
    };
}

line_items! {
    // Income statement
    Revenue => ("revenue", Income),
    Cogs => ("cogs", Income),
    GrossProfit => ("gross_profit", Income),
    Sga => ("sga", Income),
    Rd => ("rd", Income),
    OtherOpex => ("other_opex", Income),
    Depreciation => ("depreciation", Income),
    Amortization => ("amortization", Income),
    TotalOpex => ("total_opex", Income),
    Ebit => ("ebit", Income),
    Ebitda => ("ebitda", Income),
    InterestExpense => ("interest_expense", Income),
    InterestIncome => ("interest_income", Income),
    OtherIncomeExpense => ("other_income_expense", Income),
    Ebt => ("ebt", Income),
    TaxExpense => ("tax_expense", Income),
    NetIncome => ("net_income", Income),

    // Balance sheet
    Cash => ("cash", Balance),
    ShortTermInvestments => ("short_term_investments", Balance),
    AccountsReceivable => ("accounts_receivable", Balance),
    Inventory => ("inventory", Balance),
    PrepaidExpenses => ("prepaid_expenses", Balance),
    OtherCurrentAssets => ("other_current_assets", Balance),
    TotalCurrentAssets => ("total_current_assets", Balance),
    PpeGross => ("ppe_gross", Balance),
    AccumulatedDepreciation => ("accumulated_depreciation", Balance),
    PpeNet => ("ppe_net", Balance),
    Goodwill => ("goodwill", Balance),
    IntangibleAssets => ("intangible_assets", Balance),
    OtherNonCurrentAssets => ("other_non_current_assets", Balance),
    TotalNonCurrentAssets => ("total_non_current_assets", Balance),
    TotalAssets => ("total_assets", Balance),
    AccountsPayable => ("accounts_payable", Balance),
    AccruedLiabilities => ("accrued_liabilities", Balance),
    ShortTermDebt => ("short_term_debt", Balance),
    CurrentPortionLtd => ("current_portion_ltd", Balance),
    OtherCurrentLiabilities => ("other_current_liabilities", Balance),
    TotalCurrentLiabilities => ("total_current_liabilities", Balance),
    LongTermDebt => ("long_term_debt", Balance),
    DeferredTaxLiability => ("deferred_tax_liability", Balance),
    OtherNonCurrentLiabilities => ("other_non_current_liabilities", Balance),
    TotalNonCurrentLiabilities => ("total_non_current_liabilities", Balance),
    TotalLiabilities => ("total_liabilities", Balance),
    CommonStock => ("common_stock", Balance),
    AdditionalPaidInCapital => ("additional_paid_in_capital", Balance),
    RetainedEarnings => ("retained_earnings", Balance),
    TreasuryStock => ("treasury_stock", Balance),
    AccumulatedOtherComprehensiveIncome => ("accumulated_other_comprehensive_income", Balance),
    TotalEquity => ("total_equity", Balance),
    TotalLiabilitiesAndEquity => ("total_liabilities_and_equity", Balance),

    // Cash flow statement
    CfNetIncome => ("net_income", CashFlow),
    DepreciationAmortization => ("depreciation_amortization", CashFlow),
    StockBasedCompensation => ("stock_based_compensation", CashFlow),
    DeferredTaxes => ("deferred_taxes", CashFlow),
    ChangeInReceivables => ("change_in_receivables", CashFlow),
    ChangeInInventory => ("change_in_inventory", CashFlow),
    ChangeInPayables => ("change_in_payables", CashFlow),
    ChangeInOtherWorkingCapital => ("change_in_other_working_capital", CashFlow),
    OtherOperating => ("other_operating", CashFlow),
    CashFromOperations => ("cash_from_operations", CashFlow),
    Capex => ("capex", CashFlow),
    AssetSales => ("asset_sales", CashFlow),
    Acquisitions => ("acquisitions", CashFlow),
    PurchaseOfInvestments => ("purchase_of_investments", CashFlow),
    SaleOfInvestments => ("sale_of_investments", CashFlow),
    OtherInvesting => ("other_investing", CashFlow),
    CashFromInvesting => ("cash_from_investing", CashFlow),
    DebtIssuance => ("debt_issuance", CashFlow),
    DebtRepayment => ("debt_repayment", CashFlow),
    EquityIssuance => ("equity_issuance", CashFlow),
    ShareRepurchases => ("share_repurchases", CashFlow),
    DividendsPaid => ("dividends_paid", CashFlow),
    OtherFinancing => ("other_financing", CashFlow),
    CashFromFinancing => ("cash_from_financing", CashFlow),
    NetChangeInCash => ("net_change_in_cash", CashFlow),
    BeginningCash => ("beginning_cash", CashFlow),
    EndingCash => ("ending_cash", CashFlow),
    FreeCashFlow => ("free_cash_flow", CashFlow),
}

/// Cash-flow lines that are outflows by convention and must be negative.
pub const OUTFLOW_ITEMS: &[LineItem] = &[
    LineItem::Capex,
    LineItem::Acquisitions,
    LineItem::PurchaseOfInvestments,
    LineItem::DebtRepayment,
    LineItem::ShareRepurchases,
    LineItem::DividendsPaid,
];

impl LineItem {
    /// Registered label: the canonical name with `_` read as a space.
    pub fn label(self) -> String {
        self.name().replace('_', " ")
    }

    /// Look up a line item by canonical name within a statement.
    pub fn from_name(statement: StatementKind, name: &str) -> Option<LineItem> {
        Self::ALL
            .iter()
            .copied()
            .find(|item| item.statement() == statement && item.name() == name)
    }

    /// All line items of one statement, in presentation order.
    pub fn for_statement(statement: StatementKind) -> impl Iterator<Item = LineItem> {
        Self::ALL
            .iter()
            .copied()
            .filter(move |item| item.statement() == statement)
    }

    /// Whether this is a cash-flow outflow line.
    pub fn is_outflow(self) -> bool {
        OUTFLOW_ITEMS.contains(&self)
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for LineItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
