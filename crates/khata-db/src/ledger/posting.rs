//! # Posting Engine
//!
//! Turns a [`PostingRequest`] into exactly one balanced, posted journal
//! batch, or into nothing at all.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.plan()            validate + Money conversion + Σdr == Σcr     │
//! │       │                    (fails here ⇒ no row anywhere)               │
//! │       ▼                                                                 │
//! │  ┌── attempt ─────────────────────────────────────────────────────┐     │
//! │  │ 1. deduplicated type? active batch for the reference ⇒ return  │     │
//! │  │ 2. resolve roles → accounts (party accounts created on demand) │     │
//! │  │ 3. BEGIN; commit_batch; COMMIT                                 │     │
//! │  └────────────────────────────────────────────────────────────────┘     │
//! │       │ busy / unique collision                                         │
//! │       └──► back off, attempt again (the duplicate is found in step 1)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A retried invoice is therefore answered with the batch that already
//! exists for it, whether the first writer was this process or another.

use khata_core::{EntryDraft, JournalBatch, PostingPlan, PostingRequest};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::chart::ChartOfAccounts;
use super::commit::{commit_batch, BatchDraft};
use super::with_retries;
use crate::config::PostingSettings;
use crate::error::LedgerResult;
use crate::repository::BatchRepository;

/// Posting Engine.
#[derive(Debug, Clone)]
pub struct PostingEngine {
    pool: SqlitePool,
    chart: ChartOfAccounts,
    batches: BatchRepository,
    settings: PostingSettings,
}

impl PostingEngine {
    pub fn new(pool: SqlitePool, settings: PostingSettings) -> Self {
        PostingEngine {
            chart: ChartOfAccounts::new(pool.clone()),
            batches: BatchRepository::new(pool.clone()),
            pool,
            settings,
        }
    }

    /// Posts a request and returns its batch.
    ///
    /// For deduplicated reference types a repeat of an already posted
    /// document returns the existing batch unchanged.
    pub async fn post(&self, request: &PostingRequest) -> LedgerResult<JournalBatch> {
        let plan = request.plan()?;
        let label = reference_label(request);

        let plan = &plan;
        let label_ref = label.as_str();
        with_retries(&self.settings, label_ref, move || {
            self.attempt(request, plan, label_ref)
        })
        .await
    }

    async fn attempt(
        &self,
        request: &PostingRequest,
        plan: &PostingPlan,
        label: &str,
    ) -> LedgerResult<JournalBatch> {
        if let Some(existing) = self.existing_batch(request).await? {
            info!(
                reference = label,
                batch_number = %existing.batch_number,
                "Reference already posted, returning existing batch"
            );
            return Ok(existing);
        }

        let mut entries: Vec<EntryDraft> = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let account = self.chart.resolve(&line.role).await?;
            entries.push(line.to_draft(account.id)?);
        }

        let draft = BatchDraft {
            reference_type: request.reference_type,
            reference_id: request
                .reference_id
                .as_deref()
                .map(|id| id.trim().to_string()),
            description: request.description.clone(),
            transaction_date: request.transaction_date,
            created_by: request.created_by.clone(),
            entries,
        };

        let mut tx = self.pool.begin().await?;
        let batch = commit_batch(&mut tx, draft).await?;
        tx.commit().await?;

        info!(
            reference = label,
            batch_number = %batch.batch_number,
            total = %plan.total,
            lines = plan.lines.len(),
            "Journal batch posted"
        );
        Ok(batch)
    }

    async fn existing_batch(&self, request: &PostingRequest) -> LedgerResult<Option<JournalBatch>> {
        if !request.reference_type.is_deduplicated() {
            return Ok(None);
        }
        let Some(reference_id) = request.reference_id.as_deref() else {
            return Ok(None);
        };

        debug!(reference_type = %request.reference_type, reference_id, "Idempotency check");
        Ok(self
            .batches
            .find_active_by_reference(request.reference_type, reference_id.trim())
            .await?)
    }
}

fn reference_label(request: &PostingRequest) -> String {
    match request.reference_id.as_deref() {
        Some(id) => format!("{} {}", request.reference_type, id.trim()),
        None => request.reference_type.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::BatchFilter;
    use chrono::NaiveDate;
    use khata_core::events::{self, PartyRef, SaleTotals, Settlement};
    use khata_core::{
        AccountRole, ErrorKind, Money, PartyType, ReferenceType, SystemAccount, ValidationError,
    };
    use rust_decimal::Decimal;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.chart().bootstrap().await.unwrap();
        db
    }

    async fn balance_of(db: &Database, code: &str) -> i64 {
        db.accounts()
            .get_by_code(code)
            .await
            .unwrap()
            .unwrap()
            .current_balance_minor
    }

    fn cash_sale_request() -> PostingRequest {
        events::cash_sale(
            "order-1",
            "INV-0001",
            date(),
            SaleTotals {
                subtotal: Money::from_minor(10000),
                tax: Money::from_minor(1800),
            },
        )
    }

    #[tokio::test]
    async fn test_cash_sale_posts_balanced_batch() {
        let db = setup().await;

        let batch = db.posting().post(&cash_sale_request()).await.unwrap();

        assert_eq!(batch.total_debit_minor, 11800);
        assert_eq!(batch.total_credit_minor, 11800);
        assert!(batch.is_balanced);
        assert!(batch.is_posted);
        assert!(!batch.is_reversed);
        assert_eq!(batch.batch_number, "JB-INV-000001");
        assert_eq!(batch.reference_id.as_deref(), Some("order-1"));

        let entries = db.entries().list_by_batch(&batch.id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].debit_minor, 11800);
        assert_eq!(entries[1].credit_minor, 10000);
        assert_eq!(entries[2].credit_minor, 1800);
        assert_eq!(entries[0].narration.as_deref(), Some("Invoice INV-0001"));

        assert_eq!(balance_of(&db, SystemAccount::Cash.code()).await, 11800);
        assert_eq!(balance_of(&db, SystemAccount::Sales.code()).await, 10000);
        assert_eq!(balance_of(&db, SystemAccount::TaxPayable.code()).await, 1800);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_returns_existing_batch() {
        let db = setup().await;
        let posting = db.posting();

        let first = posting.post(&cash_sale_request()).await.unwrap();
        let second = posting.post(&cash_sale_request()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            db.batches()
                .count_by_reference(ReferenceType::Invoice, "order-1")
                .await
                .unwrap(),
            1
        );
        assert_eq!(db.entries().count_by_batch(&first.id).await.unwrap(), 3);
        assert_eq!(balance_of(&db, SystemAccount::Cash.code()).await, 11800);
    }

    #[tokio::test]
    async fn test_credit_sale_then_receipt_settles_customer() {
        let db = setup().await;
        let posting = db.posting();
        let customer = PartyRef::new("c-1", "Asha Stores");

        posting
            .post(&events::credit_sale(
                "order-7",
                "INV-0007",
                date(),
                &customer,
                SaleTotals {
                    subtotal: Money::from_minor(50000),
                    tax: Money::zero(),
                },
            ))
            .await
            .unwrap();

        let balances = db.balances();
        assert_eq!(
            balances.party_balance(PartyType::Customer, "c-1").await.unwrap(),
            Money::from_minor(50000)
        );
        assert_eq!(
            balances
                .cached_party_balance(PartyType::Customer, "c-1")
                .await
                .unwrap(),
            Money::from_minor(50000)
        );

        posting
            .post(&events::customer_receipt(
                "pay-1",
                "RCP-0001",
                date(),
                &customer,
                Money::from_minor(50000),
                Settlement::Cash,
            ))
            .await
            .unwrap();

        assert!(balances
            .party_balance(PartyType::Customer, "c-1")
            .await
            .unwrap()
            .is_zero());
        assert!(balances
            .cached_party_balance(PartyType::Customer, "c-1")
            .await
            .unwrap()
            .is_zero());
        assert_eq!(balance_of(&db, SystemAccount::Cash.code()).await, 50000);
    }

    #[tokio::test]
    async fn test_unbalanced_request_writes_nothing() {
        let db = setup().await;

        let request = PostingRequest::new(ReferenceType::Invoice, "order-9", date())
            .debit(AccountRole::customer("c-9", "Never Created"), Decimal::new(10000, 2))
            .credit(AccountRole::System(SystemAccount::Sales), Decimal::new(9000, 2));

        let err = db.posting().post(&request).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::Unbalanced { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(db
            .accounts()
            .find_by_party(PartyType::Customer, "c-9")
            .await
            .unwrap()
            .is_none());
        assert!(db
            .batches()
            .list(&BatchFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_inactive_account_rejects_posting() {
        let db = setup().await;
        let chart = db.chart();
        let account = chart
            .get_or_create_party_account(PartyType::Supplier, "s-1", "Metro Wholesale")
            .await
            .unwrap();
        chart.deactivate(&account.id).await.unwrap();

        let request = events::purchase_bill(
            "pur-1",
            "BILL-01",
            date(),
            &PartyRef::new("s-1", "Metro Wholesale"),
            Money::from_minor(2500),
        );
        let err = db.posting().post(&request).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InactiveAccount { .. })
        ));
        assert_eq!(balance_of(&db, SystemAccount::Purchases.code()).await, 0);
    }

    #[tokio::test]
    async fn test_payment_toggle_is_not_deduplicated() {
        let db = setup().await;
        let posting = db.posting();
        let customer = PartyRef::new("c-2", "Ravi Traders");
        let amount = Money::from_minor(1500);

        let paid =
            events::payment_toggle("order-2", "INV-0002", date(), &customer, amount, true);
        let unpaid =
            events::payment_toggle("order-2", "INV-0002", date(), &customer, amount, false);

        let a = posting.post(&paid).await.unwrap();
        let b = posting.post(&unpaid).await.unwrap();
        let c = posting.post(&paid).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(
            db.batches()
                .count_by_reference(ReferenceType::PaymentToggle, "order-2")
                .await
                .unwrap(),
            3
        );
        assert_eq!(balance_of(&db, SystemAccount::Cash.code()).await, 1500);
    }

    #[tokio::test]
    async fn test_adjustment_without_reference() {
        let db = setup().await;

        let request = PostingRequest::unreferenced(ReferenceType::Opening, date())
            .description("Opening cash")
            .debit(AccountRole::System(SystemAccount::Cash), Decimal::from(2000))
            .credit(AccountRole::System(SystemAccount::OwnersCapital), Decimal::from(2000));

        let batch = db.posting().post(&request).await.unwrap();
        assert_eq!(batch.batch_number, "JB-OPN-000001");
        assert!(batch.reference_id.is_none());
        assert_eq!(balance_of(&db, SystemAccount::OwnersCapital.code()).await, 200000);
    }

    #[tokio::test]
    async fn test_posting_requires_bootstrap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.posting().post(&cash_sale_request()).await.unwrap_err();
        assert!(matches!(err, LedgerError::SystemAccountMissing { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_post_once() {
        let path = std::env::temp_dir().join(format!("khata-test-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        db.chart().bootstrap().await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let posting = db.posting();
            tasks.push(tokio::spawn(async move {
                posting.post(&cash_sale_request()).await
            }));
        }

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        assert_eq!(
            db.batches()
                .count_by_reference(ReferenceType::Invoice, "order-1")
                .await
                .unwrap(),
            1
        );
        assert_eq!(balance_of(&db, SystemAccount::Cash.code()).await, 11800);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
