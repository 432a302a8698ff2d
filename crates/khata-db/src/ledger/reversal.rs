//! # Reversal Engine
//!
//! Undoes a posted batch by appending its mirror image. History is never
//! edited: the original batch and entries stay as they were, except for the
//! `is_reversed` / `reversed_batch_id` flags set in the same transaction as
//! the reversing batch.
//!
//! ```text
//!   JB-INV-000007 (original)            JB-REV-000002 (reversal)
//!   ─────────────────────────           ─────────────────────────
//!   Cash        Dr 118.00        ──►    Cash        Cr 118.00
//!   Sales       Cr 100.00        ──►    Sales       Dr 100.00
//!   GST Payable Cr  18.00        ──►    GST Payable Dr  18.00
//!   is_reversed = 1, reversed_batch_id = JB-REV-000002's id
//! ```

use chrono::Utc;
use khata_core::validation::validate_name;
use khata_core::{EntryDraft, JournalBatch, Money, ReferenceType, MAX_NARRATION_LEN};
use sqlx::SqlitePool;
use tracing::info;

use super::commit::{commit_batch, BatchDraft};
use super::with_retries;
use crate::config::PostingSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::repository::{batch, BatchRepository, EntryRepository};

/// Reversal Engine.
#[derive(Debug, Clone)]
pub struct ReversalEngine {
    pool: SqlitePool,
    batches: BatchRepository,
    entries: EntryRepository,
    settings: PostingSettings,
}

impl ReversalEngine {
    pub fn new(pool: SqlitePool, settings: PostingSettings) -> Self {
        ReversalEngine {
            batches: BatchRepository::new(pool.clone()),
            entries: EntryRepository::new(pool.clone()),
            pool,
            settings,
        }
    }

    /// Reverses a posted batch and returns the reversing batch.
    pub async fn reverse(&self, batch_id: &str, reason: &str) -> LedgerResult<JournalBatch> {
        validate_name("reason", reason)?;
        let reason = reason.trim();

        let label = format!("{} {}", ReferenceType::Reversal, batch_id);
        with_retries(&self.settings, &label, move || self.attempt(batch_id, reason)).await
    }

    /// Reverses the active batch posted for a business document.
    ///
    /// This is the deletion path for invoices, payments and purchases.
    pub async fn reverse_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
        reason: &str,
    ) -> LedgerResult<JournalBatch> {
        let original = self
            .batches
            .find_active_by_reference(reference_type, reference_id.trim())
            .await?
            .ok_or_else(|| LedgerError::ReferenceNotFound {
                reference_type,
                reference_id: reference_id.trim().to_string(),
            })?;

        self.reverse(&original.id, reason).await
    }

    async fn attempt(&self, batch_id: &str, reason: &str) -> LedgerResult<JournalBatch> {
        let original = self
            .batches
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.to_string()))?;

        if original.is_reversed {
            return Err(LedgerError::AlreadyReversed(original.batch_number));
        }
        if !original.is_posted {
            return Err(LedgerError::NotPosted(original.batch_number));
        }

        let stored = self.entries.list_by_batch(&original.id).await?;
        let mut mirrored = Vec::with_capacity(stored.len());
        for row in &stored {
            let entry = EntryDraft::new(
                row.account_id.as_str(),
                Money::from_minor(row.debit_minor),
                Money::from_minor(row.credit_minor),
                None,
            )?;
            mirrored.push(entry.swapped(Some(reversal_narration(
                &original.batch_number,
                row.narration.as_deref(),
            ))));
        }

        let draft = BatchDraft {
            reference_type: ReferenceType::Reversal,
            reference_id: Some(original.id.clone()),
            description: Some(format!("Reversal of {}: {}", original.batch_number, reason)),
            transaction_date: Utc::now().date_naive(),
            created_by: None,
            entries: mirrored,
        };

        let mut tx = self.pool.begin().await?;
        let reversal = commit_batch(&mut tx, draft).await?;
        if !batch::mark_reversed(&mut tx, &original.id, &reversal.id).await? {
            // lost the race to another reversal; dropping tx discards ours
            return Err(LedgerError::AlreadyReversed(original.batch_number));
        }
        tx.commit().await?;

        info!(
            original = %original.batch_number,
            reversal = %reversal.batch_number,
            reason,
            "Journal batch reversed"
        );
        Ok(reversal)
    }
}

fn reversal_narration(batch_number: &str, original: Option<&str>) -> String {
    match original {
        Some(text) if text.chars().count() + "Reversal: ".len() <= MAX_NARRATION_LEN => {
            format!("Reversal: {text}")
        }
        _ => format!("Reversal of {batch_number}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use khata_core::events::{self, PartyRef, SaleTotals};
    use khata_core::{ErrorKind, PartyType, SystemAccount};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn test_reversal_narration_counts_characters() {
        // 100 rupee signs are 300 bytes but only 100 characters
        let rupees = "₹".repeat(100);
        assert_eq!(
            reversal_narration("JB-INV-000001", Some(&rupees)),
            format!("Reversal: {rupees}")
        );

        let devanagari = "बिक्री".repeat(40);
        assert!(reversal_narration("JB-INV-000001", Some(&devanagari)).starts_with("Reversal: बिक्री"));

        let too_long = "x".repeat(MAX_NARRATION_LEN);
        assert_eq!(
            reversal_narration("JB-INV-000001", Some(&too_long)),
            "Reversal of JB-INV-000001"
        );
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.chart().bootstrap().await.unwrap();
        db
    }

    fn invoice(order_id: &str) -> khata_core::PostingRequest {
        events::credit_sale(
            order_id,
            "INV-0042",
            date(),
            &PartyRef::new("c-1", "Asha Stores"),
            SaleTotals {
                subtotal: Money::from_minor(20000),
                tax: Money::zero(),
            },
        )
    }

    #[tokio::test]
    async fn test_reversal_restores_balances() {
        let db = setup().await;
        let balances = db.balances();
        let sales = db.chart().system_account(SystemAccount::Sales).await.unwrap();
        let before = balances.account_balance(&sales.id).await.unwrap();

        let original = db.posting().post(&invoice("order-42")).await.unwrap();
        assert_eq!(
            balances.account_balance(&sales.id).await.unwrap(),
            before + Money::from_minor(20000)
        );

        let reversal = db
            .reversal()
            .reverse(&original.id, "Invoice deleted")
            .await
            .unwrap();

        assert_eq!(reversal.reference_type, ReferenceType::Reversal);
        assert_eq!(reversal.reference_id.as_deref(), Some(original.id.as_str()));
        assert_eq!(reversal.total_debit_minor, original.total_debit_minor);
        assert_eq!(
            reversal.description.as_deref(),
            Some(format!("Reversal of {}: Invoice deleted", original.batch_number).as_str())
        );
        assert_eq!(balances.account_balance(&sales.id).await.unwrap(), before);
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
        assert_eq!(
            db.accounts().get_by_id(&sales.id).await.unwrap().unwrap().current_balance(),
            before
        );

        let reloaded = db.batches().get_by_id(&original.id).await.unwrap().unwrap();
        assert!(reloaded.is_reversed);
        assert_eq!(reloaded.reversed_batch_id.as_deref(), Some(reversal.id.as_str()));
        assert_eq!(reloaded.total_debit_minor, original.total_debit_minor);
    }

    #[tokio::test]
    async fn test_reversal_mirrors_each_line() {
        let db = setup().await;
        let original = db.posting().post(&invoice("order-43")).await.unwrap();
        let before = db.entries().list_by_batch(&original.id).await.unwrap();

        let reversal = db.reversal().reverse(&original.id, "Void").await.unwrap();

        let after = db.entries().list_by_batch(&original.id).await.unwrap();
        assert_eq!(before, after);

        let mirrored = db.entries().list_by_batch(&reversal.id).await.unwrap();
        assert_eq!(mirrored.len(), before.len());
        for (orig, rev) in before.iter().zip(&mirrored) {
            assert_eq!(rev.account_id, orig.account_id);
            assert_eq!(rev.debit_minor, orig.credit_minor);
            assert_eq!(rev.credit_minor, orig.debit_minor);
            assert_eq!(rev.narration.as_deref(), Some("Reversal: Invoice INV-0042"));
        }
    }

    #[tokio::test]
    async fn test_double_reversal_rejected() {
        let db = setup().await;
        let original = db.posting().post(&invoice("order-44")).await.unwrap();
        let reversal = db.reversal();

        reversal.reverse(&original.id, "Void").await.unwrap();
        let err = reversal.reverse(&original.id, "Void again").await.unwrap_err();

        assert!(matches!(err, LedgerError::AlreadyReversed(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            db.batches()
                .count_by_reference(ReferenceType::Reversal, &original.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_batch_is_not_found() {
        let db = setup().await;
        let err = db.reversal().reverse("missing", "Void").await.unwrap_err();
        assert!(matches!(err, LedgerError::BatchNotFound(_)));
    }

    #[tokio::test]
    async fn test_reason_is_required() {
        let db = setup().await;
        let original = db.posting().post(&invoice("order-45")).await.unwrap();

        let err = db.reversal().reverse(&original.id, "  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!db.batches().get_by_id(&original.id).await.unwrap().unwrap().is_reversed);
    }

    #[tokio::test]
    async fn test_reverse_reference_then_repost() {
        let db = setup().await;
        let posting = db.posting();
        let first = posting.post(&invoice("order-46")).await.unwrap();

        db.reversal()
            .reverse_reference(ReferenceType::Invoice, "order-46", "Corrected invoice")
            .await
            .unwrap();

        let second = posting.post(&invoice("order-46")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(
            db.balances()
                .party_balance(PartyType::Customer, "c-1")
                .await
                .unwrap(),
            Money::from_minor(20000)
        );

        let active = db
            .balances()
            .find_active_by_reference(ReferenceType::Invoice, "order-46")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, second.id);
    }

    #[tokio::test]
    async fn test_reverse_reference_without_batch() {
        let db = setup().await;
        let err = db
            .reversal()
            .reverse_reference(ReferenceType::Payment, "pay-404", "Deleted")
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ReferenceNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
