//! # Ledger Entry Repository
//!
//! Database operations for ledger entries. Entries are append-only: the
//! only write is [`insert`], always inside a batch's posting transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::LedgerEntry;

/// Repository for ledger entry reads.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    /// Creates a new EntryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntryRepository { pool }
    }

    /// Entries of one batch, in line order.
    pub async fn list_by_batch(&self, batch_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, batch_id, account_id, line_no, debit_minor, credit_minor, narration, created_at
            FROM ledger_entries
            WHERE batch_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count_by_batch(&self, batch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE batch_id = ?1")
            .bind(batch_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_by_account(&self, account_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE account_id = ?1")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

/// Appends one entry.
pub async fn insert(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    debug!(
        batch_id = %entry.batch_id,
        account_id = %entry.account_id,
        line_no = entry.line_no,
        debit = entry.debit_minor,
        credit = entry.credit_minor,
        "Inserting ledger entry"
    );

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, batch_id, account_id, line_no, debit_minor, credit_minor, narration, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.batch_id)
    .bind(&entry.account_id)
    .bind(entry.line_no)
    .bind(entry.debit_minor)
    .bind(entry.credit_minor)
    .bind(&entry.narration)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Every (debit, credit) pair stored for a batch, as seen by this
/// transaction.
pub async fn amounts_for_batch(
    conn: &mut SqliteConnection,
    batch_id: &str,
) -> DbResult<Vec<(i64, i64)>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT debit_minor, credit_minor FROM ledger_entries WHERE batch_id = ?1 ORDER BY line_no",
    )
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
