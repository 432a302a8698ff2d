//! # Domain Types
//!
//! Core domain types of the double-entry ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │  JournalBatch   │   │  LedgerEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┤  batch_number   │──►│  batch_id (FK)  │       │
//! │  │  code "1100"    │   │  reference_type │   │  account_id(FK) │       │
//! │  │  account_type   │   │  reference_id   │   │  debit_minor    │       │
//! │  │  party link     │   │  totals         │   │  credit_minor   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  AccountType    │   │ ReferenceType   │   │     Party       │       │
//! │  │  ASSET          │   │ INVOICE ★       │   │  customer /     │       │
//! │  │  LIABILITY      │   │ PAYMENT ★       │   │  supplier       │       │
//! │  │  INCOME         │   │ PURCHASE ★      │   │  balance cache  │       │
//! │  │  EXPENSE        │   │ EXPENSE ★       │   └─────────────────┘       │
//! │  │  EQUITY         │   │ REVERSAL, ...   │   ★ = deduplicated          │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (account code, batch number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1800 bps = 18% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole/fractional percentage.
    pub fn from_percent(pct: rust_decimal::Decimal) -> Option<Self> {
        use rust_decimal::prelude::ToPrimitive;
        (pct * rust_decimal::Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
            .map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Side
// =============================================================================

/// Which column of the ledger a line lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    /// The opposite side (used by reversals).
    #[inline]
    pub const fn flip(self) -> Self {
        match self {
            Side::Debit => Side::Credit,
            Side::Credit => Side::Debit,
        }
    }
}

// =============================================================================
// Account Type
// =============================================================================

/// Top-level classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Asset,
    Liability,
    Income,
    Expense,
    Equity,
}

impl AccountType {
    /// The side on which this account type naturally carries a balance.
    ///
    /// ```text
    /// ASSET, EXPENSE                → debit-normal  (debit increases)
    /// LIABILITY, INCOME, EQUITY     → credit-normal (credit increases)
    /// ```
    #[inline]
    pub const fn normal_side(self) -> Side {
        match self {
            AccountType::Asset | AccountType::Expense => Side::Debit,
            AccountType::Liability | AccountType::Income | AccountType::Equity => Side::Credit,
        }
    }

    /// Signed balance of raw debit/credit totals under this type's convention.
    #[inline]
    pub fn signed_balance(self, debit: Money, credit: Money) -> Money {
        match self.normal_side() {
            Side::Debit => debit - credit,
            Side::Credit => credit - debit,
        }
    }

    /// Uppercase label as stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
            AccountType::Equity => "EQUITY",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Party Type
// =============================================================================

/// Kind of trading partner a party account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PartyType {
    Customer,
    Supplier,
}

impl PartyType {
    /// The system control account party sub-accounts hang under.
    pub const fn control_account(self) -> SystemAccount {
        match self {
            PartyType::Customer => SystemAccount::AccountsReceivable,
            PartyType::Supplier => SystemAccount::AccountsPayable,
        }
    }

    /// Account type of the party's sub-account.
    pub const fn account_type(self) -> AccountType {
        match self {
            PartyType::Customer => AccountType::Asset,
            PartyType::Supplier => AccountType::Liability,
        }
    }

    /// Sub-type classifier of the party's sub-account.
    pub const fn sub_type(self) -> &'static str {
        match self {
            PartyType::Customer => "RECEIVABLE",
            PartyType::Supplier => "PAYABLE",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PartyType::Customer => "customer",
            PartyType::Supplier => "supplier",
        }
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reference Type
// =============================================================================

/// The kind of business event a journal batch records.
///
/// ## Extension Point
/// This is a closed set. Adding a variant means:
/// 1. Give it a batch-number prefix in [`ReferenceType::batch_prefix`]
/// 2. Decide [`ReferenceType::is_deduplicated`]
/// 3. If deduplicated, add it to the `journal_batches_ref_unique` partial
///    index in a new migration - the two lists must stay identical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Invoice,
    Payment,
    Purchase,
    Expense,
    Migration,
    Adjustment,
    Opening,
    Reversal,
    PaymentToggle,
    InvoiceCash,
}

impl ReferenceType {
    /// All reference types, in declaration order.
    pub const ALL: [ReferenceType; 10] = [
        ReferenceType::Invoice,
        ReferenceType::Payment,
        ReferenceType::Purchase,
        ReferenceType::Expense,
        ReferenceType::Migration,
        ReferenceType::Adjustment,
        ReferenceType::Opening,
        ReferenceType::Reversal,
        ReferenceType::PaymentToggle,
        ReferenceType::InvoiceCash,
    ];

    /// Whether at most one active batch may exist per (type, reference id).
    ///
    /// Must match the `WHERE` clause of `journal_batches_ref_unique`.
    /// PAYMENT_TOGGLE and INVOICE_CASH are intentionally excluded: a
    /// payment's status can be flipped more than once.
    pub const fn is_deduplicated(self) -> bool {
        matches!(
            self,
            ReferenceType::Invoice
                | ReferenceType::Payment
                | ReferenceType::Purchase
                | ReferenceType::Expense
        )
    }

    /// Short code used in batch numbers (`JB-INV-000123`).
    pub const fn batch_prefix(self) -> &'static str {
        match self {
            ReferenceType::Invoice => "INV",
            ReferenceType::Payment => "PAY",
            ReferenceType::Purchase => "PUR",
            ReferenceType::Expense => "EXP",
            ReferenceType::Migration => "MIG",
            ReferenceType::Adjustment => "ADJ",
            ReferenceType::Opening => "OPN",
            ReferenceType::Reversal => "REV",
            ReferenceType::PaymentToggle => "PTG",
            ReferenceType::InvoiceCash => "ICS",
        }
    }

    /// Label as stored in the database.
    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceType::Invoice => "INVOICE",
            ReferenceType::Payment => "PAYMENT",
            ReferenceType::Purchase => "PURCHASE",
            ReferenceType::Expense => "EXPENSE",
            ReferenceType::Migration => "MIGRATION",
            ReferenceType::Adjustment => "ADJUSTMENT",
            ReferenceType::Opening => "OPENING",
            ReferenceType::Reversal => "REVERSAL",
            ReferenceType::PaymentToggle => "PAYMENT_TOGGLE",
            ReferenceType::InvoiceCash => "INVOICE_CASH",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ReferenceType::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "reference_type".to_string(),
                allowed: ReferenceType::ALL
                    .iter()
                    .map(|r| r.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// System Accounts
// =============================================================================

/// Fixed accounts created at bootstrap.
///
/// ## Default Chart
/// ```text
/// 1000 Assets              2000 Liabilities        3000 Equity
///  ├─ 1100 Cash             ├─ 2100 Accounts Pay.   ├─ 3100 Owner's Capital
///  ├─ 1200 Bank             │   └─ 2100-NNN supp.   └─ 3200 Retained Earnings
///  ├─ 1300 Accounts Rec.    └─ 2200 GST Payable
///  │   └─ 1300-NNN cust.                           5000 Expenses
///  └─ 1400 Inventory       4000 Income              ├─ 5100 COGS
///                           ├─ 4100 Sales Revenue   ├─ 5200 Operating Exp.
///                           └─ 4200 Other Income    └─ 5300 Purchase Exp.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SystemAccount {
    Assets,
    Cash,
    Bank,
    AccountsReceivable,
    Inventory,
    Liabilities,
    AccountsPayable,
    TaxPayable,
    Equity,
    OwnersCapital,
    RetainedEarnings,
    Income,
    Sales,
    OtherIncome,
    Expenses,
    CostOfGoodsSold,
    OperatingExpenses,
    Purchases,
}

impl SystemAccount {
    /// Every system account, parents before children.
    pub const ALL: [SystemAccount; 18] = [
        SystemAccount::Assets,
        SystemAccount::Cash,
        SystemAccount::Bank,
        SystemAccount::AccountsReceivable,
        SystemAccount::Inventory,
        SystemAccount::Liabilities,
        SystemAccount::AccountsPayable,
        SystemAccount::TaxPayable,
        SystemAccount::Equity,
        SystemAccount::OwnersCapital,
        SystemAccount::RetainedEarnings,
        SystemAccount::Income,
        SystemAccount::Sales,
        SystemAccount::OtherIncome,
        SystemAccount::Expenses,
        SystemAccount::CostOfGoodsSold,
        SystemAccount::OperatingExpenses,
        SystemAccount::Purchases,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            SystemAccount::Assets => "1000",
            SystemAccount::Cash => "1100",
            SystemAccount::Bank => "1200",
            SystemAccount::AccountsReceivable => "1300",
            SystemAccount::Inventory => "1400",
            SystemAccount::Liabilities => "2000",
            SystemAccount::AccountsPayable => "2100",
            SystemAccount::TaxPayable => "2200",
            SystemAccount::Equity => "3000",
            SystemAccount::OwnersCapital => "3100",
            SystemAccount::RetainedEarnings => "3200",
            SystemAccount::Income => "4000",
            SystemAccount::Sales => "4100",
            SystemAccount::OtherIncome => "4200",
            SystemAccount::Expenses => "5000",
            SystemAccount::CostOfGoodsSold => "5100",
            SystemAccount::OperatingExpenses => "5200",
            SystemAccount::Purchases => "5300",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SystemAccount::Assets => "Assets",
            SystemAccount::Cash => "Cash",
            SystemAccount::Bank => "Bank",
            SystemAccount::AccountsReceivable => "Accounts Receivable",
            SystemAccount::Inventory => "Inventory",
            SystemAccount::Liabilities => "Liabilities",
            SystemAccount::AccountsPayable => "Accounts Payable",
            SystemAccount::TaxPayable => "GST Payable",
            SystemAccount::Equity => "Equity",
            SystemAccount::OwnersCapital => "Owner's Capital",
            SystemAccount::RetainedEarnings => "Retained Earnings",
            SystemAccount::Income => "Income",
            SystemAccount::Sales => "Sales Revenue",
            SystemAccount::OtherIncome => "Other Income",
            SystemAccount::Expenses => "Expenses",
            SystemAccount::CostOfGoodsSold => "Cost of Goods Sold",
            SystemAccount::OperatingExpenses => "Operating Expenses",
            SystemAccount::Purchases => "Purchase Expenses",
        }
    }

    pub const fn account_type(self) -> AccountType {
        match self {
            SystemAccount::Assets
            | SystemAccount::Cash
            | SystemAccount::Bank
            | SystemAccount::AccountsReceivable
            | SystemAccount::Inventory => AccountType::Asset,
            SystemAccount::Liabilities
            | SystemAccount::AccountsPayable
            | SystemAccount::TaxPayable => AccountType::Liability,
            SystemAccount::Equity
            | SystemAccount::OwnersCapital
            | SystemAccount::RetainedEarnings => AccountType::Equity,
            SystemAccount::Income | SystemAccount::Sales | SystemAccount::OtherIncome => {
                AccountType::Income
            }
            SystemAccount::Expenses
            | SystemAccount::CostOfGoodsSold
            | SystemAccount::OperatingExpenses
            | SystemAccount::Purchases => AccountType::Expense,
        }
    }

    pub const fn sub_type(self) -> Option<&'static str> {
        match self {
            SystemAccount::Cash => Some("CASH"),
            SystemAccount::Bank => Some("BANK"),
            SystemAccount::AccountsReceivable => Some("RECEIVABLE"),
            SystemAccount::Inventory => Some("INVENTORY"),
            SystemAccount::AccountsPayable => Some("PAYABLE"),
            SystemAccount::TaxPayable => Some("TAX"),
            SystemAccount::Sales => Some("SALES"),
            SystemAccount::CostOfGoodsSold => Some("COGS"),
            SystemAccount::Purchases => Some("PURCHASE"),
            _ => None,
        }
    }

    /// The group account this one sits under (None for top-level groups).
    pub const fn parent(self) -> Option<SystemAccount> {
        match self {
            SystemAccount::Assets
            | SystemAccount::Liabilities
            | SystemAccount::Equity
            | SystemAccount::Income
            | SystemAccount::Expenses => None,
            SystemAccount::Cash
            | SystemAccount::Bank
            | SystemAccount::AccountsReceivable
            | SystemAccount::Inventory => Some(SystemAccount::Assets),
            SystemAccount::AccountsPayable | SystemAccount::TaxPayable => {
                Some(SystemAccount::Liabilities)
            }
            SystemAccount::OwnersCapital | SystemAccount::RetainedEarnings => {
                Some(SystemAccount::Equity)
            }
            SystemAccount::Sales | SystemAccount::OtherIncome => Some(SystemAccount::Income),
            SystemAccount::CostOfGoodsSold
            | SystemAccount::OperatingExpenses
            | SystemAccount::Purchases => Some(SystemAccount::Expenses),
        }
    }

    /// Looks a system account up by its chart code.
    pub fn from_code(code: &str) -> Option<SystemAccount> {
        SystemAccount::ALL.into_iter().find(|a| a.code() == code)
    }
}

// =============================================================================
// Account
// =============================================================================

/// A node in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Short unique chart code ("1100", "1300-004").
    pub code: String,

    /// Display name.
    pub name: String,

    pub account_type: AccountType,

    /// Free-form classifier (RECEIVABLE, PAYABLE, CASH, BANK, ...).
    pub sub_type: Option<String>,

    /// Group account this one rolls up into.
    pub parent_id: Option<String>,

    pub party_type: Option<PartyType>,

    /// Customer/supplier id in the collaborator's system.
    pub party_id: Option<String>,

    pub description: Option<String>,

    pub is_active: bool,

    /// System accounts cannot be deleted or deactivated.
    pub is_system_account: bool,

    /// Normal-side running balance cache, in paise.
    pub current_balance_minor: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns the cached balance as Money.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_minor(self.current_balance_minor)
    }

    /// Whether this is a customer/supplier sub-account.
    #[inline]
    pub fn is_party_account(&self) -> bool {
        self.party_type.is_some() && self.party_id.is_some()
    }
}

// =============================================================================
// Party
// =============================================================================

/// A customer or supplier as seen by the ledger: identity plus the
/// denormalized running balance collaborators read for fast display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Party {
    pub party_type: PartyType,
    pub party_id: String,
    pub name: String,
    /// Receivable (customer) or payable (supplier) balance, in paise.
    pub current_balance_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Party {
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_minor(self.current_balance_minor)
    }
}

// =============================================================================
// Journal Batch
// =============================================================================

/// A balanced group of ledger entries representing one business event.
///
/// Immutable after commit, except for `is_reversed` / `reversed_batch_id`
/// which the reversal engine sets exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct JournalBatch {
    pub id: String,
    /// Human-readable, unique: `JB-INV-000123`.
    pub batch_number: String,
    pub reference_type: ReferenceType,
    /// Originating business object (order, payment, bill, reversed batch).
    pub reference_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: NaiveDate,
    pub total_debit_minor: i64,
    pub total_credit_minor: i64,
    pub is_balanced: bool,
    pub is_posted: bool,
    pub is_reversed: bool,
    /// Set once a reversing batch exists.
    pub reversed_batch_id: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl JournalBatch {
    #[inline]
    pub fn total_debit(&self) -> Money {
        Money::from_minor(self.total_debit_minor)
    }

    #[inline]
    pub fn total_credit(&self) -> Money {
        Money::from_minor(self.total_credit_minor)
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One debit or credit line against one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub batch_id: String,
    pub account_id: String,
    /// Position within the batch, preserving the caller's line order.
    pub line_no: i64,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub narration: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn debit(&self) -> Money {
        Money::from_minor(self.debit_minor)
    }

    #[inline]
    pub fn credit(&self) -> Money {
        Money::from_minor(self.credit_minor)
    }

    /// Which side this entry posts to (debit wins only if credit is zero).
    #[inline]
    pub fn side(&self) -> Side {
        if self.debit_minor > 0 {
            Side::Debit
        } else {
            Side::Credit
        }
    }
}

/// A batch together with its lines, as returned by read-only listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchWithEntries {
    pub batch: JournalBatch,
    pub entries: Vec<LedgerEntry>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_side() {
        assert_eq!(AccountType::Asset.normal_side(), Side::Debit);
        assert_eq!(AccountType::Expense.normal_side(), Side::Debit);
        assert_eq!(AccountType::Liability.normal_side(), Side::Credit);
        assert_eq!(AccountType::Income.normal_side(), Side::Credit);
        assert_eq!(AccountType::Equity.normal_side(), Side::Credit);
    }

    #[test]
    fn test_signed_balance() {
        let debit = Money::from_minor(500);
        let credit = Money::from_minor(200);
        assert_eq!(AccountType::Asset.signed_balance(debit, credit).minor(), 300);
        assert_eq!(AccountType::Income.signed_balance(debit, credit).minor(), -300);
    }

    #[test]
    fn test_reference_type_dedup_scope() {
        let deduped: Vec<_> = ReferenceType::ALL
            .into_iter()
            .filter(|r| r.is_deduplicated())
            .collect();
        assert_eq!(
            deduped,
            vec![
                ReferenceType::Invoice,
                ReferenceType::Payment,
                ReferenceType::Purchase,
                ReferenceType::Expense
            ]
        );
    }

    #[test]
    fn test_reference_type_parse_and_serde() {
        assert_eq!(
            "payment_toggle".parse::<ReferenceType>().unwrap(),
            ReferenceType::PaymentToggle
        );
        assert!("REFUND".parse::<ReferenceType>().is_err());

        let json = serde_json::to_string(&ReferenceType::InvoiceCash).unwrap();
        assert_eq!(json, "\"INVOICE_CASH\"");
    }

    #[test]
    fn test_batch_prefixes_unique() {
        let mut prefixes: Vec<_> = ReferenceType::ALL.iter().map(|r| r.batch_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), ReferenceType::ALL.len());
    }

    #[test]
    fn test_system_chart_is_consistent() {
        for account in SystemAccount::ALL {
            assert_eq!(SystemAccount::from_code(account.code()), Some(account));
            if let Some(parent) = account.parent() {
                assert_eq!(parent.account_type(), account.account_type());
                assert!(parent.parent().is_none());
            }
        }
        assert_eq!(
            PartyType::Customer.control_account(),
            SystemAccount::AccountsReceivable
        );
        assert_eq!(PartyType::Supplier.account_type(), AccountType::Liability);
    }

    #[test]
    fn test_tax_rate_from_percent() {
        let rate = TaxRate::from_percent(rust_decimal::Decimal::new(18, 0)).unwrap();
        assert_eq!(rate.bps(), 1800);
    }
}
