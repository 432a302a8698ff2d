//! # Posting Module
//!
//! Pure construction of journal batches: what a collaborator asks for
//! ([`PostingRequest`]), what the engine will write ([`PostingPlan`],
//! [`EntryDraft`]), and the invariants both must satisfy.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PostingRequest          PostingPlan              Vec<EntryDraft>       │
//! │  ──────────────          ───────────              ───────────────       │
//! │  role + side +   plan()  role + side +   resolve  account_id +          │
//! │  Decimal amount ───────► Money amount  ─────────► debit XOR credit      │
//! │                    │     (balanced)     (khata-db)        │             │
//! │                    │                                      ▼             │
//! │                    ▼                               BatchTotals          │
//! │            ValidationError                   (IntegrityError if not     │
//! │            (nothing written)                  balanced at commit)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The balance check on the plan runs before any account is resolved, so an
//! unbalanced request never creates a party account or any other row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, IntegrityError, ValidationError};
use crate::money::Money;
use crate::types::{PartyType, ReferenceType, Side, SystemAccount};
use crate::validation::{
    validate_description, validate_name, validate_narration, validate_party_id,
    validate_reference_id, validate_uuid, ValidationResult,
};
use crate::MIN_POSTING_LINES;

// =============================================================================
// Account Role
// =============================================================================

/// The semantic target of a posting line, resolved to a concrete account by
/// the Chart of Accounts at posting time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountRole {
    /// One of the fixed bootstrap accounts (Cash, Sales, GST Payable, ...).
    System(SystemAccount),

    /// A customer's receivable or supplier's payable sub-account, created on
    /// first use.
    Party {
        party_type: PartyType,
        party_id: String,
        name: String,
    },

    /// An explicit account id.
    Account(String),
}

impl AccountRole {
    pub fn customer(party_id: impl Into<String>, name: impl Into<String>) -> Self {
        AccountRole::Party {
            party_type: PartyType::Customer,
            party_id: party_id.into(),
            name: name.into(),
        }
    }

    pub fn supplier(party_id: impl Into<String>, name: impl Into<String>) -> Self {
        AccountRole::Party {
            party_type: PartyType::Supplier,
            party_id: party_id.into(),
            name: name.into(),
        }
    }

    fn validate(&self) -> ValidationResult<()> {
        match self {
            AccountRole::System(_) => Ok(()),
            AccountRole::Party { party_id, name, .. } => {
                validate_party_id(party_id)?;
                validate_name("party name", name)
            }
            AccountRole::Account(id) => validate_uuid("account_id", id),
        }
    }
}

// =============================================================================
// Posting Request
// =============================================================================

/// One requested line: a role, a side and a positive major-unit amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingLine {
    pub role: AccountRole,
    pub side: Side,
    pub amount: Decimal,
    pub narration: Option<String>,
}

/// A business event as raised by a collaborator.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use khata_core::posting::{AccountRole, PostingRequest};
/// use khata_core::types::{ReferenceType, SystemAccount};
///
/// let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
/// let request = PostingRequest::new(ReferenceType::Invoice, "ORD-1001", date)
///     .description("Cash sale")
///     .debit(AccountRole::System(SystemAccount::Cash), Decimal::new(11800, 2))
///     .credit(AccountRole::System(SystemAccount::Sales), Decimal::new(10000, 2))
///     .credit(AccountRole::System(SystemAccount::TaxPayable), Decimal::new(1800, 2));
///
/// let plan = request.plan().unwrap();
/// assert_eq!(plan.total.minor(), 11800);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub lines: Vec<PostingLine>,
}

impl PostingRequest {
    /// Starts a request tied to a business document.
    pub fn new(
        reference_type: ReferenceType,
        reference_id: impl Into<String>,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            reference_type,
            reference_id: Some(reference_id.into()),
            transaction_date,
            description: None,
            created_by: None,
            lines: Vec::new(),
        }
    }

    /// Starts a request with no business document (adjustments, openings).
    pub fn unreferenced(reference_type: ReferenceType, transaction_date: NaiveDate) -> Self {
        Self {
            reference_type,
            reference_id: None,
            transaction_date,
            description: None,
            created_by: None,
            lines: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn debit(self, role: AccountRole, amount: Decimal) -> Self {
        self.line(role, Side::Debit, amount)
    }

    pub fn credit(self, role: AccountRole, amount: Decimal) -> Self {
        self.line(role, Side::Credit, amount)
    }

    /// Adds a line whose amount is already exact Money.
    pub fn debit_money(self, role: AccountRole, amount: Money) -> Self {
        self.line(role, Side::Debit, amount.to_major())
    }

    pub fn credit_money(self, role: AccountRole, amount: Money) -> Self {
        self.line(role, Side::Credit, amount.to_major())
    }

    pub fn line(mut self, role: AccountRole, side: Side, amount: Decimal) -> Self {
        self.lines.push(PostingLine {
            role,
            side,
            amount,
            narration: None,
        });
        self
    }

    /// Sets the narration of the most recently added line.
    pub fn narrate(mut self, narration: impl Into<String>) -> Self {
        if let Some(last) = self.lines.last_mut() {
            last.narration = Some(narration.into());
        }
        self
    }

    /// Checks the request against the posting contract without converting
    /// amounts.
    ///
    /// ## Rules
    /// - Deduplicated reference types carry a reference id
    /// - Description and narrations within length limits
    /// - At least [`MIN_POSTING_LINES`] lines, with both sides present
    /// - Every amount strictly positive
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference_id(self.reference_id.as_deref())?;
        if self.reference_type.is_deduplicated() && self.reference_id.is_none() {
            return Err(ValidationError::Required {
                field: "reference_id".to_string(),
            });
        }
        validate_description(self.description.as_deref())?;

        if self.lines.len() < MIN_POSTING_LINES {
            return Err(ValidationError::TooFewLines {
                min: MIN_POSTING_LINES,
                actual: self.lines.len(),
            });
        }

        for line in &self.lines {
            line.role.validate()?;
            validate_narration(line.narration.as_deref())?;
            if line.amount <= Decimal::ZERO {
                return Err(ValidationError::MustBePositive {
                    field: "amount".to_string(),
                });
            }
        }

        let has_debit = self.lines.iter().any(|l| l.side == Side::Debit);
        let has_credit = self.lines.iter().any(|l| l.side == Side::Credit);
        if !(has_debit && has_credit) {
            return Err(ValidationError::SingleSided);
        }

        Ok(())
    }

    /// Validates, converts every amount through [`Money`] and checks balance.
    pub fn plan(&self) -> CoreResult<PostingPlan> {
        self.validate()?;

        let mut lines = Vec::with_capacity(self.lines.len());
        let mut debit = Money::zero();
        let mut credit = Money::zero();

        for line in &self.lines {
            let amount = Money::from_major(line.amount)?;
            // 0.004 is positive as a Decimal but rounds to zero paise
            if !amount.is_positive() {
                return Err(ValidationError::MustBePositive {
                    field: "amount".to_string(),
                }
                .into());
            }

            let total = match line.side {
                Side::Debit => &mut debit,
                Side::Credit => &mut credit,
            };
            *total = total
                .checked_add(amount)
                .ok_or_else(|| CoreError::AmountOutOfRange("posting total".to_string()))?;

            lines.push(PlannedLine {
                role: line.role.clone(),
                side: line.side,
                amount,
                narration: line.narration.clone(),
            });
        }

        if debit != credit {
            return Err(ValidationError::Unbalanced { debit, credit }.into());
        }

        Ok(PostingPlan {
            lines,
            total: debit,
        })
    }
}

// =============================================================================
// Posting Plan
// =============================================================================

/// A request line after Money conversion, awaiting account resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub role: AccountRole,
    pub side: Side,
    pub amount: Money,
    pub narration: Option<String>,
}

impl PlannedLine {
    /// Binds the line to a resolved account.
    pub fn to_draft(&self, account_id: impl Into<String>) -> Result<EntryDraft, IntegrityError> {
        EntryDraft::on_side(account_id, self.side, self.amount, self.narration.clone())
    }
}

/// A validated, balanced request. `total` is the sum of either side.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
}

// =============================================================================
// Entry Draft
// =============================================================================

/// A ledger entry about to be written.
///
/// Construction enforces the entry invariant: amounts are never negative and
/// exactly one of debit/credit is strictly positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    account_id: String,
    debit: Money,
    credit: Money,
    narration: Option<String>,
}

impl EntryDraft {
    pub fn new(
        account_id: impl Into<String>,
        debit: Money,
        credit: Money,
        narration: Option<String>,
    ) -> Result<Self, IntegrityError> {
        if debit.is_negative() || credit.is_negative() {
            return Err(IntegrityError::NegativeAmount { debit, credit });
        }
        if debit.is_positive() == credit.is_positive() {
            return Err(IntegrityError::EntrySide { debit, credit });
        }

        Ok(Self {
            account_id: account_id.into(),
            debit,
            credit,
            narration,
        })
    }

    pub fn on_side(
        account_id: impl Into<String>,
        side: Side,
        amount: Money,
        narration: Option<String>,
    ) -> Result<Self, IntegrityError> {
        match side {
            Side::Debit => Self::new(account_id, amount, Money::zero(), narration),
            Side::Credit => Self::new(account_id, Money::zero(), amount, narration),
        }
    }

    /// The mirror-image entry: same account and amount, opposite side.
    pub fn swapped(&self, narration: Option<String>) -> Self {
        Self {
            account_id: self.account_id.clone(),
            debit: self.credit,
            credit: self.debit,
            narration,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn debit(&self) -> Money {
        self.debit
    }

    pub fn credit(&self) -> Money {
        self.credit
    }

    pub fn narration(&self) -> Option<&str> {
        self.narration.as_deref()
    }

    /// Net effect as debit minus credit.
    pub fn net_debit(&self) -> Money {
        self.debit - self.credit
    }
}

// =============================================================================
// Batch Totals
// =============================================================================

/// Debit and credit totals of a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchTotals {
    pub debit: Money,
    pub credit: Money,
}

impl BatchTotals {
    /// Sums entries with overflow checking.
    pub fn of(entries: &[EntryDraft]) -> Result<Self, IntegrityError> {
        Self::from_pairs(entries.iter().map(|e| (e.debit, e.credit)))
    }

    /// Sums raw (debit, credit) pairs, as read back from storage.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Money, Money)>) -> Result<Self, IntegrityError> {
        let mut totals = BatchTotals::default();
        for (debit, credit) in pairs {
            totals.debit = totals
                .debit
                .checked_add(debit)
                .ok_or(IntegrityError::TotalsOverflow)?;
            totals.credit = totals
                .credit
                .checked_add(credit)
                .ok_or(IntegrityError::TotalsOverflow)?;
        }
        Ok(totals)
    }

    /// Exact equality in minor units. Zero tolerance.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    pub fn ensure_balanced(&self, batch: &str) -> Result<(), IntegrityError> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(IntegrityError::BatchUnbalanced {
                batch: batch.to_string(),
                debit: self.debit,
                credit: self.credit,
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn cash() -> AccountRole {
        AccountRole::System(SystemAccount::Cash)
    }

    fn sales() -> AccountRole {
        AccountRole::System(SystemAccount::Sales)
    }

    fn rupees(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }

    #[test]
    fn test_cash_sale_plan() {
        let plan = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), rupees(11800))
            .credit(sales(), rupees(10000))
            .credit(AccountRole::System(SystemAccount::TaxPayable), rupees(1800))
            .plan()
            .unwrap();

        assert_eq!(plan.total, Money::from_minor(11800));
        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.lines[0].side, Side::Debit);
    }

    #[test]
    fn test_unbalanced_rejected() {
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), rupees(11800))
            .credit(sales(), rupees(11700))
            .plan()
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Unbalanced { debit, credit })
                if debit.minor() == 11800 && credit.minor() == 11700
        ));
    }

    #[test]
    fn test_contract_violations() {
        // one line
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), rupees(100))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooFewLines { actual: 1, .. }));

        // debits only
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), rupees(100))
            .debit(sales(), rupees(100))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::SingleSided));

        // negative amount
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), rupees(-100))
            .credit(sales(), rupees(-100))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::MustBePositive { .. }));

        // deduplicated type without a document
        let err = PostingRequest::unreferenced(ReferenceType::Payment, date())
            .debit(cash(), rupees(100))
            .credit(sales(), rupees(100))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "reference_id"));

        // adjustments need no document
        assert!(PostingRequest::unreferenced(ReferenceType::Adjustment, date())
            .debit(cash(), rupees(100))
            .credit(sales(), rupees(100))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_amount_rounding_to_zero_rejected() {
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), Decimal::new(4, 3))
            .credit(sales(), Decimal::new(4, 3))
            .plan()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_sub_paisa_amounts_round_before_balancing() {
        // 10.005 → 10.01 on both sides
        let plan = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(cash(), Decimal::new(10005, 3))
            .credit(sales(), Decimal::new(1001, 2))
            .plan()
            .unwrap();
        assert_eq!(plan.total.minor(), 1001);
    }

    #[test]
    fn test_invalid_party_role_rejected() {
        let err = PostingRequest::new(ReferenceType::Invoice, "ORD-1", date())
            .debit(AccountRole::customer("", "Asha"), rupees(100))
            .credit(sales(), rupees(100))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_entry_draft_exclusivity() {
        let zero = Money::zero();
        let ten = Money::from_minor(1000);

        assert!(EntryDraft::new("a", ten, zero, None).is_ok());
        assert!(EntryDraft::new("a", zero, ten, None).is_ok());
        assert!(matches!(
            EntryDraft::new("a", ten, ten, None),
            Err(IntegrityError::EntrySide { .. })
        ));
        assert!(matches!(
            EntryDraft::new("a", zero, zero, None),
            Err(IntegrityError::EntrySide { .. })
        ));
        assert!(matches!(
            EntryDraft::new("a", -ten, zero, None),
            Err(IntegrityError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn test_swapped_entries_balance() {
        let entries = vec![
            EntryDraft::on_side("cash", Side::Debit, Money::from_minor(11800), None).unwrap(),
            EntryDraft::on_side("sales", Side::Credit, Money::from_minor(11800), None).unwrap(),
        ];
        let swapped: Vec<_> = entries.iter().map(|e| e.swapped(None)).collect();

        assert_eq!(swapped[0].credit(), entries[0].debit());
        assert_eq!(swapped[0].account_id(), "cash");
        assert!(BatchTotals::of(&swapped).unwrap().is_balanced());
    }

    #[test]
    fn test_batch_totals() {
        let totals = BatchTotals::from_pairs(vec![
            (Money::from_minor(500), Money::zero()),
            (Money::zero(), Money::from_minor(400)),
        ])
        .unwrap();
        assert!(!totals.is_balanced());
        assert!(matches!(
            totals.ensure_balanced("JB-ADJ-000001"),
            Err(IntegrityError::BatchUnbalanced { .. })
        ));

        let overflow = BatchTotals::from_pairs(vec![
            (Money::from_minor(i64::MAX), Money::zero()),
            (Money::from_minor(1), Money::zero()),
        ]);
        assert!(matches!(overflow, Err(IntegrityError::TotalsOverflow)));
    }

    /// Debit and credit lines, topped up with one line so both sides sum to
    /// the same total.
    fn balanced_lines() -> impl Strategy<Value = Vec<(Side, i64)>> {
        (
            prop::collection::vec(1i64..10_000_000i64, 1..6),
            prop::collection::vec(1i64..10_000_000i64, 1..6),
        )
            .prop_map(|(debits, credits)| {
                let debit_sum: i64 = debits.iter().sum();
                let credit_sum: i64 = credits.iter().sum();

                let mut lines: Vec<(Side, i64)> = debits
                    .into_iter()
                    .map(|m| (Side::Debit, m))
                    .chain(credits.into_iter().map(|m| (Side::Credit, m)))
                    .collect();
                if debit_sum > credit_sum {
                    lines.push((Side::Credit, debit_sum - credit_sum));
                } else if credit_sum > debit_sum {
                    lines.push((Side::Debit, credit_sum - debit_sum));
                }
                lines
            })
    }

    fn request_of(lines: &[(Side, i64)]) -> PostingRequest {
        lines
            .iter()
            .enumerate()
            .fold(
                PostingRequest::new(ReferenceType::Adjustment, "adj-1", date()),
                |request, (i, (side, minor))| {
                    let role = if i % 2 == 0 { cash() } else { sales() };
                    request.line(role, *side, rupees(*minor))
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Positive lines with equal side sums always plan into a balanced batch.
        #[test]
        fn equal_sides_plan_into_balanced_totals(lines in balanced_lines()) {
            let expected: i64 = lines
                .iter()
                .filter(|(side, _)| *side == Side::Debit)
                .map(|(_, minor)| minor)
                .sum();

            let plan = request_of(&lines).plan().unwrap();
            prop_assert_eq!(plan.total, Money::from_minor(expected));
            prop_assert_eq!(plan.lines.len(), lines.len());

            let drafts: Vec<EntryDraft> = plan
                .lines
                .iter()
                .enumerate()
                .map(|(i, line)| line.to_draft(format!("acct-{i}")).unwrap())
                .collect();
            let totals = BatchTotals::of(&drafts).unwrap();
            prop_assert!(totals.is_balanced());
            prop_assert_eq!(totals.debit, plan.total);
        }

        /// Any single line removed from a balanced set leaves it unbalanced.
        #[test]
        fn dropping_a_line_unbalances(lines in balanced_lines(), pick in any::<prop::sample::Index>()) {
            let mut lines = lines;
            lines.remove(pick.index(lines.len()));
            prop_assume!(lines.len() >= MIN_POSTING_LINES);
            prop_assume!(lines.iter().any(|(s, _)| *s == Side::Debit));
            prop_assume!(lines.iter().any(|(s, _)| *s == Side::Credit));

            let err = request_of(&lines).plan().unwrap_err();
            prop_assert!(
                matches!(err, CoreError::Validation(ValidationError::Unbalanced { .. })),
                "unexpected error: {err:?}"
            );
        }

        /// The mirror image of a valid batch is balanced and flips every line.
        #[test]
        fn swapped_entries_mirror_each_line(lines in balanced_lines()) {
            let drafts: Vec<EntryDraft> = lines
                .iter()
                .enumerate()
                .map(|(i, (side, minor))| {
                    EntryDraft::on_side(format!("acct-{i}"), *side, Money::from_minor(*minor), None)
                        .unwrap()
                })
                .collect();
            let mirrored: Vec<EntryDraft> = drafts.iter().map(|e| e.swapped(None)).collect();

            let original = BatchTotals::of(&drafts).unwrap();
            let reversed = BatchTotals::of(&mirrored).unwrap();
            prop_assert!(reversed.is_balanced());
            prop_assert_eq!(reversed.debit, original.credit);

            for (entry, mirror) in drafts.iter().zip(&mirrored) {
                prop_assert_eq!(mirror.account_id(), entry.account_id());
                prop_assert_eq!(mirror.debit(), entry.credit());
                prop_assert_eq!(mirror.credit(), entry.debit());
                prop_assert_eq!(mirror.net_debit(), -entry.net_debit());
            }
        }
    }
}
