//! # Report Types
//!
//! Read-only views derived from posted entries. Produced by khata-db's
//! balance projection, consumed by dashboards and receivable/payable reports.
//!
//! All amounts are [`Money`]; signs follow each account type's normal side
//! unless a field says otherwise.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Account, AccountType, PartyType, ReferenceType};

// =============================================================================
// Account Statement
// =============================================================================

/// One entry on an account statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementLine {
    pub entry_id: String,
    pub batch_id: String,
    pub batch_number: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: NaiveDate,
    pub narration: Option<String>,
    pub debit: Money,
    pub credit: Money,
    /// Normal-side balance after this line.
    pub running_balance: Money,
}

/// An account's entries over a period with running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountStatement {
    pub account: Account,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    /// Balance of everything posted before `from`.
    pub opening_balance: Money,
    pub lines: Vec<StatementLine>,
    pub closing_balance: Money,
}

// =============================================================================
// Trial Balance
// =============================================================================

/// One account on the trial balance. Exactly one of `debit`/`credit` is
/// non-zero: the account's net position placed in its column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrialBalanceRow {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrialBalance {
    #[ts(as = "Option<String>")]
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub is_balanced: bool,
}

// =============================================================================
// Profit & Loss / Balance Sheet
// =============================================================================

/// An account and its normal-side amount within a report section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportLine {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitAndLoss {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub income: Vec<ReportLine>,
    pub expenses: Vec<ReportLine>,
    pub total_income: Money,
    pub total_expenses: Money,
    /// Income minus expenses; negative is a loss.
    pub net_profit: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceSheet {
    #[ts(as = "Option<String>")]
    pub as_of: Option<NaiveDate>,
    pub assets: Vec<ReportLine>,
    pub liabilities: Vec<ReportLine>,
    pub equity: Vec<ReportLine>,
    /// Unclosed income minus expenses, shown under equity.
    pub current_earnings: Money,
    pub total_assets: Money,
    pub total_liabilities: Money,
    /// Equity accounts plus current earnings.
    pub total_equity: Money,
    /// Assets == liabilities + equity.
    pub is_balanced: bool,
}

// =============================================================================
// Reconciliation
// =============================================================================

/// What a drifted cache belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftSubject {
    Account { account_id: String, code: String },
    Party { party_type: PartyType, party_id: String },
}

/// A cached balance that disagrees with the entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceDrift {
    pub subject: DriftSubject,
    pub cached: Money,
    pub derived: Money,
}

impl BalanceDrift {
    pub fn difference(&self) -> Money {
        self.cached - self.derived
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationReport {
    pub accounts_checked: u32,
    pub parties_checked: u32,
    pub drifts: Vec<BalanceDrift>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }
}
