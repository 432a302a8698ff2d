//! # Journal Batch Repository
//!
//! Database operations for journal batches.
//!
//! ## Batch Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Batch Lifecycle                                   │
//! │                                                                         │
//! │  (one transaction)                                                     │
//! │  1. insert()       → is_balanced = 0, is_posted = 0, totals set        │
//! │  2. entries inserted, re-summed from storage                           │
//! │  3. mark_posted()  → is_balanced = 1, is_posted = 1                    │
//! │  ─────────── commit: the batch is now visible ───────────               │
//! │                                                                         │
//! │  (reversal transaction, at most once)                                  │
//! │  4. mark_reversed() → is_reversed = 1, reversed_batch_id set           │
//! │                                                                         │
//! │  Never deleted; financial columns guarded by triggers.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::{JournalBatch, ReferenceType};

const SELECT_BATCH: &str = r#"
    SELECT
        id, batch_number, reference_type, reference_id, description,
        transaction_date, total_debit_minor, total_credit_minor,
        is_balanced, is_posted, is_reversed, reversed_batch_id,
        created_by, created_at
    FROM journal_batches
"#;

/// Listing filter for [`BatchRepository::list`].
#[derive(Debug, Clone)]
pub struct BatchFilter {
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_reversed: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for BatchFilter {
    fn default() -> Self {
        BatchFilter {
            reference_type: None,
            reference_id: None,
            from: None,
            to: None,
            include_reversed: true,
            limit: 100,
            offset: 0,
        }
    }
}

/// Repository for journal batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<JournalBatch>> {
        let batch = sqlx::query_as::<_, JournalBatch>(&format!("{SELECT_BATCH} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Gets a batch by its human-readable number.
    pub async fn get_by_number(&self, batch_number: &str) -> DbResult<Option<JournalBatch>> {
        let batch = sqlx::query_as::<_, JournalBatch>(&format!(
            "{SELECT_BATCH} WHERE batch_number = ?1"
        ))
        .bind(batch_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// The posted, non-reversed batch for a business document, if any.
    ///
    /// This is the idempotency lookup. For deduplicated reference types the
    /// partial unique index guarantees at most one match; for the others the
    /// most recent match is returned.
    pub async fn find_active_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<Option<JournalBatch>> {
        let batch = sqlx::query_as::<_, JournalBatch>(&format!(
            r#"{SELECT_BATCH}
            WHERE reference_type = ?1 AND reference_id = ?2
              AND is_reversed = 0 AND is_posted = 1
            ORDER BY created_at DESC, batch_number DESC
            LIMIT 1"#
        ))
        .bind(reference_type)
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Lists batches, newest transaction date first.
    pub async fn list(&self, filter: &BatchFilter) -> DbResult<Vec<JournalBatch>> {
        let batches = sqlx::query_as::<_, JournalBatch>(&format!(
            r#"{SELECT_BATCH}
            WHERE (?1 IS NULL OR reference_type = ?1)
              AND (?2 IS NULL OR reference_id = ?2)
              AND (?3 IS NULL OR transaction_date >= ?3)
              AND (?4 IS NULL OR transaction_date <= ?4)
              AND (?5 = 1 OR is_reversed = 0)
            ORDER BY transaction_date DESC, created_at DESC, batch_number DESC
            LIMIT ?6 OFFSET ?7"#
        ))
        .bind(filter.reference_type)
        .bind(filter.reference_id.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.include_reversed)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Number of batches recorded for a business document, reversed or not.
    pub async fn count_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journal_batches WHERE reference_type = ?1 AND reference_id = ?2",
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

/// Inserts a batch row (not yet posted).
pub async fn insert(conn: &mut SqliteConnection, batch: &JournalBatch) -> DbResult<()> {
    debug!(
        id = %batch.id,
        batch_number = %batch.batch_number,
        reference_type = %batch.reference_type,
        "Inserting journal batch"
    );

    sqlx::query(
        r#"
        INSERT INTO journal_batches (
            id, batch_number, reference_type, reference_id, description,
            transaction_date, total_debit_minor, total_credit_minor,
            is_balanced, is_posted, is_reversed, reversed_batch_id,
            created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.batch_number)
    .bind(batch.reference_type)
    .bind(&batch.reference_id)
    .bind(&batch.description)
    .bind(batch.transaction_date)
    .bind(batch.total_debit_minor)
    .bind(batch.total_credit_minor)
    .bind(batch.is_balanced)
    .bind(batch.is_posted)
    .bind(batch.is_reversed)
    .bind(&batch.reversed_batch_id)
    .bind(&batch.created_by)
    .bind(batch.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Flags a verified batch as balanced and posted.
pub async fn mark_posted(conn: &mut SqliteConnection, batch_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE journal_batches SET is_balanced = 1, is_posted = 1 WHERE id = ?1")
        .bind(batch_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Marks a batch reversed. Returns false if it was already reversed (or
/// unposted), in which case nothing changed.
pub async fn mark_reversed(
    conn: &mut SqliteConnection,
    batch_id: &str,
    reversal_id: &str,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE journal_batches
        SET is_reversed = 1, reversed_batch_id = ?2
        WHERE id = ?1 AND is_reversed = 0 AND is_posted = 1
        "#,
    )
    .bind(batch_id)
    .bind(reversal_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
