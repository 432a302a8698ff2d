//! # Sequence Repository
//!
//! Monotonic counters backing batch numbers (`JB-INV-000123`) and party
//! sub-account codes (`1300-004`).
//!
//! ## Allocation
//! ```text
//! INSERT INTO ledger_sequences (prefix, last_value) VALUES (?, 1)
//! ON CONFLICT (prefix) DO UPDATE SET last_value = last_value + 1
//! RETURNING last_value
//! ```
//! One statement, so two writers can never read the same value. A value
//! allocated inside a transaction that later rolls back is returned to the
//! pool with it; a value consumed by a committed-but-unused insert leaves a gap.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use khata_core::{ReferenceType, BATCH_NUMBER_PREFIX, PARTY_CODE_WIDTH, SEQUENCE_WIDTH};

/// Repository for inspecting sequences.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Last value handed out for a prefix, if any.
    pub async fn current(&self, prefix: &str) -> DbResult<Option<i64>> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM ledger_sequences WHERE prefix = ?1")
                .bind(prefix)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }
}

/// Allocates the next value for a prefix.
pub async fn next_value(conn: &mut SqliteConnection, prefix: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO ledger_sequences (prefix, last_value) VALUES (?1, 1)
        ON CONFLICT (prefix) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(value)
}

/// Sequence key for batch numbers of one reference type: `JB-INV`.
pub fn batch_sequence_key(reference_type: ReferenceType) -> String {
    format!("{}-{}", BATCH_NUMBER_PREFIX, reference_type.batch_prefix())
}

/// `JB-INV-000123`
pub fn format_batch_number(reference_type: ReferenceType, value: i64) -> String {
    format!(
        "{}-{:0width$}",
        batch_sequence_key(reference_type),
        value,
        width = SEQUENCE_WIDTH
    )
}

/// `1300-004`
pub fn format_party_code(control_code: &str, value: i64) -> String {
    format!("{}-{:0width$}", control_code, value, width = PARTY_CODE_WIDTH)
}
