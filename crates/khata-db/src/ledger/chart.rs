//! # Chart of Accounts
//!
//! Resolves semantic roles ("cash", "sales", "receivable for customer X")
//! to concrete accounts, creating party sub-accounts on first use.
//!
//! ## Party Account Find-or-Create
//! ```text
//! get_or_create_party_account(customer, "c-42", "Asha Stores")
//!      │
//!      ├── SELECT by (party_type, party_id) ── found ──► return it
//!      │
//!      ▼  (own short transaction)
//!   next code 1300-NNN
//!   INSERT parties  ... ON CONFLICT DO NOTHING
//!   INSERT accounts ... ON CONFLICT DO NOTHING   ← unique (party_type, party_id)
//!   COMMIT
//!      │
//!      ▼
//!   SELECT by (party_type, party_id) ──► the one row, whoever inserted it
//! ```
//! Never read-then-write: two callers racing for the same party both end up
//! with the same account.

use chrono::Utc;
use khata_core::validation::{validate_name, validate_party_id};
use khata_core::{Account, AccountRole, PartyType, SystemAccount, ValidationError};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::{account, party, sequence, AccountFilter, AccountRepository};

/// Chart of Accounts engine.
#[derive(Debug, Clone)]
pub struct ChartOfAccounts {
    pool: SqlitePool,
    accounts: AccountRepository,
}

impl ChartOfAccounts {
    pub fn new(pool: SqlitePool) -> Self {
        ChartOfAccounts {
            accounts: AccountRepository::new(pool.clone()),
            pool,
        }
    }

    /// Creates the default system chart. Idempotent; returns how many
    /// accounts were created by this call.
    pub async fn bootstrap(&self) -> LedgerResult<usize> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut created = 0;

        for system in SystemAccount::ALL {
            let row = Account {
                id: Uuid::new_v4().to_string(),
                code: system.code().to_string(),
                name: system.name().to_string(),
                account_type: system.account_type(),
                sub_type: system.sub_type().map(str::to_string),
                parent_id: None,
                party_type: None,
                party_id: None,
                description: None,
                is_active: true,
                is_system_account: true,
                current_balance_minor: 0,
                created_at: now,
                updated_at: now,
            };
            if account::insert_if_absent(&mut tx, &row).await? {
                created += 1;
            }
        }

        // second pass: parents exist now
        for system in SystemAccount::ALL {
            if let Some(parent) = system.parent() {
                account::link_parent(&mut tx, system.code(), parent.code()).await?;
            }
        }

        tx.commit().await?;

        if created > 0 {
            info!(created, "System chart of accounts bootstrapped");
        } else {
            debug!("System chart of accounts already present");
        }
        Ok(created)
    }

    /// The singleton account for a system role.
    ///
    /// Fails with `SystemAccountMissing` if bootstrap never ran.
    pub async fn system_account(&self, system: SystemAccount) -> LedgerResult<Account> {
        self.accounts
            .get_by_code(system.code())
            .await?
            .ok_or_else(|| LedgerError::SystemAccountMissing {
                code: system.code().to_string(),
            })
    }

    /// The sub-account of a customer or supplier, created on first use.
    pub async fn get_or_create_party_account(
        &self,
        party_type: PartyType,
        party_id: &str,
        party_name: &str,
    ) -> LedgerResult<Account> {
        validate_party_id(party_id)?;
        validate_name("party name", party_name)?;
        let party_id = party_id.trim();
        let party_name = party_name.trim();

        if let Some(existing) = self.accounts.find_by_party(party_type, party_id).await? {
            return Ok(existing);
        }

        let control = self.system_account(party_type.control_account()).await?;

        let mut tx = self.pool.begin().await?;
        let seq = sequence::next_value(&mut tx, control.code.as_str()).await?;
        let now = Utc::now();
        let row = Account {
            id: Uuid::new_v4().to_string(),
            code: sequence::format_party_code(&control.code, seq),
            name: party_name.to_string(),
            account_type: party_type.account_type(),
            sub_type: Some(party_type.sub_type().to_string()),
            parent_id: Some(control.id.clone()),
            party_type: Some(party_type),
            party_id: Some(party_id.to_string()),
            description: None,
            is_active: true,
            is_system_account: false,
            current_balance_minor: 0,
            created_at: now,
            updated_at: now,
        };

        party::ensure(&mut tx, party_type, party_id, party_name).await?;
        let created = account::insert_if_absent(&mut tx, &row).await?;
        tx.commit().await?;

        if created {
            info!(%party_type, party_id = %party_id, code = %row.code, "Created party account");
        }

        self.accounts
            .find_by_party(party_type, party_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(format!("{party_type}:{party_id}")))
    }

    /// Resolves a posting role to an active account.
    pub async fn resolve(&self, role: &AccountRole) -> LedgerResult<Account> {
        let account = match role {
            AccountRole::System(system) => self.system_account(*system).await?,
            AccountRole::Party {
                party_type,
                party_id,
                name,
            } => {
                self.get_or_create_party_account(*party_type, party_id, name)
                    .await?
            }
            AccountRole::Account(id) => self.get_by_id(id).await?,
        };

        if !account.is_active {
            return Err(ValidationError::InactiveAccount { code: account.code }.into());
        }
        Ok(account)
    }

    pub async fn get_by_id(&self, id: &str) -> LedgerResult<Account> {
        self.accounts
            .get_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    pub async fn get_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.accounts
            .get_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    pub async fn list(&self, filter: &AccountFilter) -> LedgerResult<Vec<Account>> {
        Ok(self.accounts.list(filter).await?)
    }

    /// Deactivates an account so no new postings can target it.
    pub async fn deactivate(&self, id: &str) -> LedgerResult<Account> {
        let account = self.get_by_id(id).await?;
        if account.is_system_account {
            return Err(LedgerError::SystemAccountProtected(account.code));
        }

        self.accounts.set_active(id, false).await?;
        info!(code = %account.code, "Account deactivated");
        self.get_by_id(id).await
    }

    /// Re-activates a previously deactivated account.
    pub async fn reactivate(&self, id: &str) -> LedgerResult<Account> {
        self.get_by_id(id).await?;
        self.accounts.set_active(id, true).await?;
        self.get_by_id(id).await
    }

    /// Deletes an account that is neither a system account nor referenced
    /// by any entry.
    pub async fn delete(&self, id: &str) -> LedgerResult<()> {
        let account = self.get_by_id(id).await?;
        if account.is_system_account {
            return Err(LedgerError::SystemAccountProtected(account.code));
        }
        if self.accounts.has_entries(id).await? {
            return Err(LedgerError::AccountInUse(account.code));
        }

        // Guarded delete: loses to a concurrent first posting.
        if !self.accounts.delete_unused(id).await? {
            return Err(LedgerError::AccountInUse(account.code));
        }

        info!(code = %account.code, "Account deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::{AccountType, ErrorKind};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.chart().bootstrap().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let chart = db.chart();

        assert_eq!(chart.bootstrap().await.unwrap(), SystemAccount::ALL.len());
        assert_eq!(chart.bootstrap().await.unwrap(), 0);

        let all = chart.list(&AccountFilter::default()).await.unwrap();
        assert_eq!(all.len(), SystemAccount::ALL.len());
    }

    #[tokio::test]
    async fn test_bootstrap_links_parents() {
        let db = setup().await;
        let chart = db.chart();

        let assets = chart.system_account(SystemAccount::Assets).await.unwrap();
        let cash = chart.system_account(SystemAccount::Cash).await.unwrap();
        assert_eq!(cash.parent_id.as_deref(), Some(assets.id.as_str()));
        assert!(assets.parent_id.is_none());
        assert_eq!(cash.sub_type.as_deref(), Some("CASH"));
        assert!(cash.is_system_account);
    }

    #[tokio::test]
    async fn test_system_account_missing_without_bootstrap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.chart().system_account(SystemAccount::Cash).await.unwrap_err();

        assert!(matches!(err, LedgerError::SystemAccountMissing { ref code } if code == "1100"));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[tokio::test]
    async fn test_party_account_find_or_create() {
        let db = setup().await;
        let chart = db.chart();

        let first = chart
            .get_or_create_party_account(PartyType::Customer, "c-1", "Asha Stores")
            .await
            .unwrap();
        let again = chart
            .get_or_create_party_account(PartyType::Customer, "c-1", "Asha Stores")
            .await
            .unwrap();
        let second = chart
            .get_or_create_party_account(PartyType::Customer, "c-2", "Ravi Traders")
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.code, "1300-001");
        assert_eq!(second.code, "1300-002");
        assert_eq!(first.account_type, AccountType::Asset);
        assert_eq!(first.sub_type.as_deref(), Some("RECEIVABLE"));

        let receivable = chart
            .system_account(SystemAccount::AccountsReceivable)
            .await
            .unwrap();
        assert_eq!(first.parent_id.as_deref(), Some(receivable.id.as_str()));

        let party = db.parties().get(PartyType::Customer, "c-1").await.unwrap().unwrap();
        assert_eq!(party.name, "Asha Stores");
        assert!(party.current_balance().is_zero());
    }

    #[tokio::test]
    async fn test_supplier_account_is_payable() {
        let db = setup().await;
        let supplier = db
            .chart()
            .get_or_create_party_account(PartyType::Supplier, "s-1", "Metro Wholesale")
            .await
            .unwrap();

        assert_eq!(supplier.code, "2100-001");
        assert_eq!(supplier.account_type, AccountType::Liability);
        assert_eq!(supplier.sub_type.as_deref(), Some("PAYABLE"));
    }

    #[tokio::test]
    async fn test_system_accounts_are_protected() {
        let db = setup().await;
        let chart = db.chart();
        let cash = chart.system_account(SystemAccount::Cash).await.unwrap();

        assert!(matches!(
            chart.delete(&cash.id).await,
            Err(LedgerError::SystemAccountProtected(_))
        ));
        assert!(matches!(
            chart.deactivate(&cash.id).await,
            Err(LedgerError::SystemAccountProtected(_))
        ));
    }

    #[tokio::test]
    async fn test_unused_party_account_can_be_deleted() {
        let db = setup().await;
        let chart = db.chart();
        let account = chart
            .get_or_create_party_account(PartyType::Customer, "c-9", "One-off")
            .await
            .unwrap();

        chart.delete(&account.id).await.unwrap();
        assert!(matches!(
            chart.get_by_id(&account.id).await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_account_rejected_by_resolve() {
        let db = setup().await;
        let chart = db.chart();
        let account = chart
            .get_or_create_party_account(PartyType::Customer, "c-3", "Closed Account")
            .await
            .unwrap();
        chart.deactivate(&account.id).await.unwrap();

        let err = chart
            .resolve(&AccountRole::customer("c-3", "Closed Account"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InactiveAccount { .. })
        ));

        chart.reactivate(&account.id).await.unwrap();
        assert!(chart
            .resolve(&AccountRole::Account(account.id.clone()))
            .await
            .is_ok());
    }
}
