//! # Party Repository
//!
//! Customers and suppliers as the ledger knows them: a name and the
//! denormalized running balance collaborators read for fast display.
//!
//! The balance cache is only ever moved by the posting engine's balance
//! propagation step, inside the posting transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::{Party, PartyType};

/// Repository for party database operations.
#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
}

impl PartyRepository {
    /// Creates a new PartyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PartyRepository { pool }
    }

    /// Gets a party by type and collaborator id.
    pub async fn get(&self, party_type: PartyType, party_id: &str) -> DbResult<Option<Party>> {
        let party = sqlx::query_as::<_, Party>(
            r#"
            SELECT party_type, party_id, name, current_balance_minor, created_at, updated_at
            FROM parties
            WHERE party_type = ?1 AND party_id = ?2
            "#,
        )
        .bind(party_type)
        .bind(party_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(party)
    }

    /// Lists parties of one type ordered by name.
    pub async fn list(&self, party_type: PartyType) -> DbResult<Vec<Party>> {
        let parties = sqlx::query_as::<_, Party>(
            r#"
            SELECT party_type, party_id, name, current_balance_minor, created_at, updated_at
            FROM parties
            WHERE party_type = ?1
            ORDER BY name, party_id
            "#,
        )
        .bind(party_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(parties)
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

/// Creates the party record unless it exists. Returns true when created.
pub async fn ensure(
    conn: &mut SqliteConnection,
    party_type: PartyType,
    party_id: &str,
    name: &str,
) -> DbResult<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO parties (party_type, party_id, name, current_balance_minor, created_at, updated_at)
        VALUES (?1, ?2, ?3, 0, ?4, ?4)
        ON CONFLICT (party_type, party_id) DO NOTHING
        "#,
    )
    .bind(party_type)
    .bind(party_id)
    .bind(name)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let created = result.rows_affected() > 0;
    if created {
        debug!(%party_type, party_id = %party_id, "Created party record");
    }
    Ok(created)
}

/// Moves a party's balance cache by a signed delta (atomic increment).
pub async fn apply_balance_delta(
    conn: &mut SqliteConnection,
    party_type: PartyType,
    party_id: &str,
    delta_minor: i64,
) -> DbResult<()> {
    debug!(%party_type, party_id = %party_id, delta_minor, "Applying party balance delta");

    sqlx::query(
        r#"
        UPDATE parties
        SET current_balance_minor = current_balance_minor + ?3,
            updated_at = ?4
        WHERE party_type = ?1 AND party_id = ?2
        "#,
    )
    .bind(party_type)
    .bind(party_id)
    .bind(delta_minor)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
