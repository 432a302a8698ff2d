//! # Account Repository
//!
//! Database operations for the chart of accounts.
//!
//! Reads go through [`AccountRepository`] on the pool. Writes that must be
//! part of a posting or bootstrap transaction are free functions taking a
//! `&mut SqliteConnection`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use khata_core::{Account, AccountType, PartyType};

const SELECT_ACCOUNT: &str = r#"
    SELECT
        id, code, name, account_type, sub_type, parent_id,
        party_type, party_id, description,
        is_active, is_system_account, current_balance_minor,
        created_at, updated_at
    FROM accounts
"#;

/// Listing filter for [`AccountRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub account_type: Option<AccountType>,
    pub active_only: bool,
    pub party_type: Option<PartyType>,
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Gets an account by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Account>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id(&mut conn, id).await
    }

    /// Gets an account by its chart code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!("{SELECT_ACCOUNT} WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Gets the sub-account linked to a customer or supplier.
    pub async fn find_by_party(
        &self,
        party_type: PartyType,
        party_id: &str,
    ) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "{SELECT_ACCOUNT} WHERE party_type = ?1 AND party_id = ?2"
        ))
        .bind(party_type)
        .bind(party_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists accounts ordered by code.
    pub async fn list(&self, filter: &AccountFilter) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            r#"{SELECT_ACCOUNT}
            WHERE (?1 IS NULL OR account_type = ?1)
              AND (?2 = 0 OR is_active = 1)
              AND (?3 IS NULL OR party_type = ?3)
            ORDER BY code"#
        ))
        .bind(filter.account_type)
        .bind(filter.active_only)
        .bind(filter.party_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Sets `is_active`. Returns false if no such account.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<bool> {
        debug!(id = %id, active, "Updating account active flag");

        let result = sqlx::query(
            "UPDATE accounts SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether any ledger entry references the account.
    pub async fn has_entries(&self, id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM ledger_entries WHERE account_id = ?1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Hard-deletes an unused, non-system account. Returns false if nothing
    /// matched.
    pub async fn delete_unused(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting account");

        let result = sqlx::query(
            r#"
            DELETE FROM accounts
            WHERE id = ?1
              AND is_system_account = 0
              AND NOT EXISTS (SELECT 1 FROM ledger_entries WHERE account_id = ?1)
              AND NOT EXISTS (SELECT 1 FROM accounts child WHERE child.parent_id = ?1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Transaction-bound operations
// =============================================================================

/// Gets an account by ID on an existing connection.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(&format!("{SELECT_ACCOUNT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(account)
}

/// Inserts an account unless its code or party link already exists.
///
/// Returns true when a row was created. Concurrent callers racing on the
/// same code or party both succeed; exactly one creates the row.
pub async fn insert_if_absent(conn: &mut SqliteConnection, account: &Account) -> DbResult<bool> {
    debug!(code = %account.code, name = %account.name, "Inserting account");

    let result = sqlx::query(
        r#"
        INSERT INTO accounts (
            id, code, name, account_type, sub_type, parent_id,
            party_type, party_id, description,
            is_active, is_system_account, current_balance_minor,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&account.id)
    .bind(&account.code)
    .bind(&account.name)
    .bind(account.account_type)
    .bind(&account.sub_type)
    .bind(&account.parent_id)
    .bind(account.party_type)
    .bind(&account.party_id)
    .bind(&account.description)
    .bind(account.is_active)
    .bind(account.is_system_account)
    .bind(account.current_balance_minor)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Links an account to its parent by code, if not already linked.
pub async fn link_parent(
    conn: &mut SqliteConnection,
    code: &str,
    parent_code: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE accounts
        SET parent_id = (SELECT id FROM accounts WHERE code = ?2),
            updated_at = ?3
        WHERE code = ?1 AND parent_id IS NULL
        "#,
    )
    .bind(code)
    .bind(parent_code)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Moves the balance cache by a signed normal-side delta.
///
/// Atomic increment: correct under concurrent postings to the same account.
pub async fn apply_balance_delta(
    conn: &mut SqliteConnection,
    account_id: &str,
    delta_minor: i64,
) -> DbResult<()> {
    debug!(account_id = %account_id, delta_minor, "Applying account balance delta");

    sqlx::query(
        r#"
        UPDATE accounts
        SET current_balance_minor = current_balance_minor + ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(account_id)
    .bind(delta_minor)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
