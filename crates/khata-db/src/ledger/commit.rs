//! # Batch Commit
//!
//! The single write path shared by the posting and reversal engines.
//!
//! ## Steps (all on the caller's transaction)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BatchDraft (entries already satisfy debit XOR credit)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. BatchTotals::of(entries)  ── unbalanced? ──► IntegrityError          │
//! │  2. next batch number         (first statement: takes the write lock)  │
//! │  3. INSERT batch              is_balanced = 0, is_posted = 0            │
//! │  4. INSERT entries            line_no 1..n                              │
//! │  5. re-sum entries from storage ── mismatch? ──► IntegrityError          │
//! │  6. UPDATE batch              is_balanced = 1, is_posted = 1            │
//! │  7. balance propagation       atomic += on accounts and parties        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  caller commits (or drops the transaction: nothing is visible)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use khata_core::{
    BatchTotals, EntryDraft, IntegrityError, JournalBatch, LedgerEntry, Money, ReferenceType,
};
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::{account, batch, entry, party, sequence};

/// Everything needed to write one batch.
#[derive(Debug, Clone)]
pub(crate) struct BatchDraft {
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub created_by: Option<String>,
    pub entries: Vec<EntryDraft>,
}

/// Writes a batch, its entries and the balance deltas on `conn`.
///
/// The caller owns the transaction. On error, dropping it rolls everything
/// back.
pub(crate) async fn commit_batch(
    conn: &mut SqliteConnection,
    draft: BatchDraft,
) -> LedgerResult<JournalBatch> {
    let totals = BatchTotals::of(&draft.entries)?;
    totals.ensure_balanced(draft.reference_type.as_str())?;

    let seq = sequence::next_value(conn, &sequence::batch_sequence_key(draft.reference_type)).await?;
    let batch_number = sequence::format_batch_number(draft.reference_type, seq);
    let now = Utc::now();

    let mut journal = JournalBatch {
        id: Uuid::new_v4().to_string(),
        batch_number,
        reference_type: draft.reference_type,
        reference_id: draft.reference_id,
        description: draft.description,
        transaction_date: draft.transaction_date,
        total_debit_minor: totals.debit.minor(),
        total_credit_minor: totals.credit.minor(),
        is_balanced: false,
        is_posted: false,
        is_reversed: false,
        reversed_batch_id: None,
        created_by: draft.created_by,
        created_at: now,
    };
    batch::insert(conn, &journal).await?;

    for (index, line) in draft.entries.iter().enumerate() {
        let row = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            batch_id: journal.id.clone(),
            account_id: line.account_id().to_string(),
            line_no: index as i64 + 1,
            debit_minor: line.debit().minor(),
            credit_minor: line.credit().minor(),
            narration: line.narration().map(str::to_string),
            created_at: now,
        };
        entry::insert(conn, &row).await?;
    }

    // What was actually stored, not what we meant to store.
    let stored = entry::amounts_for_batch(conn, &journal.id).await?;
    let stored_totals = BatchTotals::from_pairs(
        stored
            .into_iter()
            .map(|(d, c)| (Money::from_minor(d), Money::from_minor(c))),
    )?;
    stored_totals.ensure_balanced(&journal.batch_number)?;
    if stored_totals != totals {
        return Err(IntegrityError::BatchUnbalanced {
            batch: journal.batch_number.clone(),
            debit: stored_totals.debit,
            credit: stored_totals.credit,
        }
        .into());
    }

    batch::mark_posted(conn, &journal.id).await?;
    journal.is_balanced = true;
    journal.is_posted = true;

    propagate_balances(conn, &draft.entries).await?;

    debug!(
        batch_number = %journal.batch_number,
        entries = draft.entries.len(),
        total = %totals.debit,
        "Batch written"
    );

    Ok(journal)
}

/// Moves account and party caches by each account's net normal-side delta.
async fn propagate_balances(
    conn: &mut SqliteConnection,
    entries: &[EntryDraft],
) -> LedgerResult<()> {
    // BTreeMap: deterministic update order
    let mut net_debit: BTreeMap<&str, Money> = BTreeMap::new();
    for line in entries {
        let slot = net_debit.entry(line.account_id()).or_default();
        *slot = slot
            .checked_add(line.net_debit())
            .ok_or(IntegrityError::TotalsOverflow)?;
    }

    for (account_id, net) in net_debit {
        let account = account::get_by_id(conn, account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let delta = account.account_type.signed_balance(net, Money::zero());
        if delta.is_zero() {
            continue;
        }

        account::apply_balance_delta(conn, &account.id, delta.minor()).await?;

        if let (Some(party_type), Some(party_id)) = (account.party_type, account.party_id.as_deref()) {
            party::apply_balance_delta(conn, party_type, party_id, delta.minor()).await?;
        }
    }

    Ok(())
}
