//! # Collaborator Events
//!
//! Ready-made [`PostingRequest`]s for the business events the order,
//! payment, purchase and expense services raise.
//!
//! ```text
//! Event               Reference       Debit                    Credit
//! ─────────────────── ─────────────── ──────────────────────── ────────────────────────
//! cash_sale           INVOICE         Cash                     Sales + GST Payable
//! credit_sale         INVOICE         Receivable[customer]     Sales + GST Payable
//! customer_receipt    PAYMENT         Cash / Bank              Receivable[customer]
//! payment_toggle      PAYMENT_TOGGLE  Cash ⇄ Receivable[customer] (direction by flag)
//! purchase_bill       PURCHASE        Purchase Expenses        Payable[supplier]
//! supplier_payment    PAYMENT         Payable[supplier]        Cash / Bank
//! expense             EXPENSE         Operating Expenses       Cash / Bank
//! ```
//!
//! Amounts are [`Money`]; the collaborator computes them with Money too.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::posting::{AccountRole, PostingRequest};
use crate::types::{ReferenceType, Side, SystemAccount};

/// A customer or supplier as identified by the calling service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: String,
    pub name: String,
}

impl PartyRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Where money was received into or paid out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    #[default]
    Cash,
    Bank,
}

impl Settlement {
    fn role(self) -> AccountRole {
        match self {
            Settlement::Cash => AccountRole::System(SystemAccount::Cash),
            Settlement::Bank => AccountRole::System(SystemAccount::Bank),
        }
    }
}

/// Pre-tax subtotal and GST of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
}

impl SaleTotals {
    pub fn total(&self) -> CoreResult<Money> {
        self.subtotal
            .checked_add(self.tax)
            .ok_or_else(|| CoreError::AmountOutOfRange("invoice total".to_string()))
    }
}

fn sale(
    order_id: &str,
    order_number: &str,
    date: NaiveDate,
    debit: AccountRole,
    description: String,
    totals: SaleTotals,
) -> PostingRequest {
    let narration = format!("Invoice {order_number}");
    let mut request = PostingRequest::new(ReferenceType::Invoice, order_id, date)
        .description(description)
        // summed as Decimal so an out-of-range total surfaces from plan()
        .line(debit, Side::Debit, totals.subtotal.to_major() + totals.tax.to_major())
        .narrate(narration.clone())
        .credit_money(AccountRole::System(SystemAccount::Sales), totals.subtotal)
        .narrate(narration.clone());

    // zero-rated goods carry no tax line
    if totals.tax.is_positive() {
        request = request
            .credit_money(AccountRole::System(SystemAccount::TaxPayable), totals.tax)
            .narrate(narration);
    }
    request
}

/// Walk-in sale paid at the counter.
pub fn cash_sale(
    order_id: &str,
    order_number: &str,
    date: NaiveDate,
    totals: SaleTotals,
) -> PostingRequest {
    sale(
        order_id,
        order_number,
        date,
        AccountRole::System(SystemAccount::Cash),
        format!("Invoice {order_number}: cash sale"),
        totals,
    )
}

/// Sale on account: the customer's receivable grows by the invoice total.
pub fn credit_sale(
    order_id: &str,
    order_number: &str,
    date: NaiveDate,
    customer: &PartyRef,
    totals: SaleTotals,
) -> PostingRequest {
    sale(
        order_id,
        order_number,
        date,
        AccountRole::customer(&customer.id, &customer.name),
        format!("Invoice {order_number}: {}", customer.name),
        totals,
    )
}

/// Money received from a customer against their receivable.
pub fn customer_receipt(
    payment_id: &str,
    payment_number: &str,
    date: NaiveDate,
    customer: &PartyRef,
    amount: Money,
    settlement: Settlement,
) -> PostingRequest {
    let narration = format!("Receipt {payment_number}");
    PostingRequest::new(ReferenceType::Payment, payment_id, date)
        .description(format!("Receipt {payment_number}: {}", customer.name))
        .debit_money(settlement.role(), amount)
        .narrate(narration.clone())
        .credit_money(AccountRole::customer(&customer.id, &customer.name), amount)
        .narrate(narration)
}

/// Flips an invoice between paid and unpaid.
///
/// Not deduplicated: the same invoice can be toggled any number of times and
/// each flip is its own correction.
pub fn payment_toggle(
    order_id: &str,
    order_number: &str,
    date: NaiveDate,
    customer: &PartyRef,
    amount: Money,
    mark_paid: bool,
) -> PostingRequest {
    let cash = AccountRole::System(SystemAccount::Cash);
    let receivable = AccountRole::customer(&customer.id, &customer.name);
    let (debit, credit, verb) = if mark_paid {
        (cash, receivable, "marked paid")
    } else {
        (receivable, cash, "marked unpaid")
    };

    PostingRequest::new(ReferenceType::PaymentToggle, order_id, date)
        .description(format!("Invoice {order_number} {verb}"))
        .debit_money(debit, amount)
        .credit_money(credit, amount)
}

/// A supplier bill: purchases expensed, supplier payable grows.
pub fn purchase_bill(
    purchase_id: &str,
    bill_number: &str,
    date: NaiveDate,
    supplier: &PartyRef,
    amount: Money,
) -> PostingRequest {
    let narration = format!("Purchase {bill_number}");
    PostingRequest::new(ReferenceType::Purchase, purchase_id, date)
        .description(format!("Purchase {bill_number}: {}", supplier.name))
        .debit_money(AccountRole::System(SystemAccount::Purchases), amount)
        .narrate(narration.clone())
        .credit_money(AccountRole::supplier(&supplier.id, &supplier.name), amount)
        .narrate(narration)
}

/// Money paid out to a supplier against their payable.
pub fn supplier_payment(
    payment_id: &str,
    payment_number: &str,
    date: NaiveDate,
    supplier: &PartyRef,
    amount: Money,
    settlement: Settlement,
) -> PostingRequest {
    let narration = format!("Payment {payment_number}");
    PostingRequest::new(ReferenceType::Payment, payment_id, date)
        .description(format!("Payment {payment_number}: {}", supplier.name))
        .debit_money(AccountRole::supplier(&supplier.id, &supplier.name), amount)
        .narrate(narration.clone())
        .credit_money(settlement.role(), amount)
        .narrate(narration)
}

/// A shop expense (rent, electricity, wages).
pub fn expense(
    expense_id: &str,
    category: &str,
    date: NaiveDate,
    amount: Money,
    settlement: Settlement,
) -> PostingRequest {
    PostingRequest::new(ReferenceType::Expense, expense_id, date)
        .description(format!("Expense: {category}"))
        .debit_money(AccountRole::System(SystemAccount::OperatingExpenses), amount)
        .narrate(category.to_string())
        .credit_money(settlement.role(), amount)
}
