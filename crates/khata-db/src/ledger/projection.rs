//! # Balance Projection
//!
//! Balances and reports derived from posted entries. The entries are the
//! source of truth; the `current_balance_minor` caches are only a fast path
//! and are checked against these sums by the reconciler.
//!
//! ## Sign Convention
//! ```text
//!   ASSET, EXPENSE               debit  - credit
//!   LIABILITY, INCOME, EQUITY    credit - debit
//! ```
//! Reversed batches stay in the sums. Their reversal batch cancels them
//! line for line, so no filtering on `is_reversed` is needed.

use chrono::NaiveDate;
use khata_core::reports::{
    AccountStatement, BalanceSheet, ProfitAndLoss, ReportLine, StatementLine, TrialBalance,
    TrialBalanceRow,
};
use khata_core::{
    AccountType, BatchWithEntries, IntegrityError, JournalBatch, Money, PartyType, ReferenceType,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::{
    AccountRepository, BatchFilter, BatchRepository, EntryRepository, PartyRepository,
};

/// Debit and credit sums of one account over posted batches.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AccountTotals {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub party_type: Option<PartyType>,
    pub party_id: Option<String>,
    pub current_balance_minor: i64,
    pub debit_minor: i64,
    pub credit_minor: i64,
}

impl AccountTotals {
    /// Normal-side balance derived from the entries.
    pub fn derived(&self) -> Money {
        self.account_type.signed_balance(
            Money::from_minor(self.debit_minor),
            Money::from_minor(self.credit_minor),
        )
    }

    fn report_line(&self) -> ReportLine {
        ReportLine {
            account_id: self.account_id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            amount: self.derived(),
        }
    }
}

/// Per-account totals for every account, restricted to batches dated within
/// `[from, to]` when given.
pub(crate) async fn account_totals(
    pool: &SqlitePool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> LedgerResult<Vec<AccountTotals>> {
    let rows = sqlx::query_as::<_, AccountTotals>(
        r#"
        SELECT
            a.id AS account_id, a.code, a.name, a.account_type,
            a.party_type, a.party_id, a.current_balance_minor,
            COALESCE(t.debit_minor, 0) AS debit_minor,
            COALESCE(t.credit_minor, 0) AS credit_minor
        FROM accounts a
        LEFT JOIN (
            SELECT e.account_id,
                   SUM(e.debit_minor) AS debit_minor,
                   SUM(e.credit_minor) AS credit_minor
            FROM ledger_entries e
            JOIN journal_batches b ON b.id = e.batch_id
            WHERE b.is_posted = 1
              AND (?1 IS NULL OR b.transaction_date >= ?1)
              AND (?2 IS NULL OR b.transaction_date <= ?2)
            GROUP BY e.account_id
        ) t ON t.account_id = a.id
        ORDER BY a.code
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct StatementRow {
    entry_id: String,
    batch_id: String,
    batch_number: String,
    reference_type: ReferenceType,
    reference_id: Option<String>,
    transaction_date: NaiveDate,
    narration: Option<String>,
    debit_minor: i64,
    credit_minor: i64,
}

/// Balance Projection.
#[derive(Debug, Clone)]
pub struct BalanceProjection {
    pool: SqlitePool,
    accounts: AccountRepository,
    parties: PartyRepository,
    batches: BatchRepository,
    entries: EntryRepository,
}

impl BalanceProjection {
    pub fn new(pool: SqlitePool) -> Self {
        BalanceProjection {
            accounts: AccountRepository::new(pool.clone()),
            parties: PartyRepository::new(pool.clone()),
            batches: BatchRepository::new(pool.clone()),
            entries: EntryRepository::new(pool.clone()),
            pool,
        }
    }

    // -------------------------------------------------------------------------
    // Balances
    // -------------------------------------------------------------------------

    /// Normal-side balance of an account over every posted entry.
    pub async fn account_balance(&self, account_id: &str) -> LedgerResult<Money> {
        self.balance_between(account_id, None, None).await
    }

    /// Normal-side balance including only batches dated on or before `as_of`.
    pub async fn account_balance_as_of(
        &self,
        account_id: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<Money> {
        self.balance_between(account_id, None, Some(as_of)).await
    }

    /// What a customer owes or what is owed to a supplier, from the entries.
    ///
    /// A party that never had a posting has no account yet; its balance is
    /// zero.
    pub async fn party_balance(&self, party_type: PartyType, party_id: &str) -> LedgerResult<Money> {
        self.party_balance_between(party_type, party_id, None).await
    }

    /// [`BalanceProjection::party_balance`] including only batches dated on
    /// or before `as_of`.
    pub async fn party_balance_as_of(
        &self,
        party_type: PartyType,
        party_id: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<Money> {
        self.party_balance_between(party_type, party_id, Some(as_of))
            .await
    }

    async fn party_balance_between(
        &self,
        party_type: PartyType,
        party_id: &str,
        to: Option<NaiveDate>,
    ) -> LedgerResult<Money> {
        match self.accounts.find_by_party(party_type, party_id.trim()).await? {
            Some(account) => self.balance_between(&account.id, None, to).await,
            None => Ok(Money::zero()),
        }
    }

    /// The party's cached running balance.
    pub async fn cached_party_balance(
        &self,
        party_type: PartyType,
        party_id: &str,
    ) -> LedgerResult<Money> {
        Ok(self
            .parties
            .get(party_type, party_id.trim())
            .await?
            .map(|party| party.current_balance())
            .unwrap_or_default())
    }

    async fn balance_between(
        &self,
        account_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<Money> {
        let account = self
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let (debit, credit) = self.sums(account_id, from, to).await?;
        Ok(account.account_type.signed_balance(debit, credit))
    }

    async fn sums(
        &self,
        account_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<(Money, Money)> {
        let (debit, credit): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(e.debit_minor), 0), COALESCE(SUM(e.credit_minor), 0)
            FROM ledger_entries e
            JOIN journal_batches b ON b.id = e.batch_id
            WHERE e.account_id = ?1
              AND b.is_posted = 1
              AND (?2 IS NULL OR b.transaction_date >= ?2)
              AND (?3 IS NULL OR b.transaction_date <= ?3)
            "#,
        )
        .bind(account_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok((Money::from_minor(debit), Money::from_minor(credit)))
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    /// Entries of one account in date order with a running balance.
    pub async fn account_statement(
        &self,
        account_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<AccountStatement> {
        let account = self
            .accounts
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        let account_type = account.account_type;

        let opening_balance = match from.and_then(|d| d.pred_opt()) {
            Some(day_before) => {
                let (debit, credit) = self.sums(account_id, None, Some(day_before)).await?;
                account_type.signed_balance(debit, credit)
            }
            None => Money::zero(),
        };

        let rows = sqlx::query_as::<_, StatementRow>(
            r#"
            SELECT
                e.id AS entry_id, e.batch_id, b.batch_number, b.reference_type,
                b.reference_id, b.transaction_date, e.narration,
                e.debit_minor, e.credit_minor
            FROM ledger_entries e
            JOIN journal_batches b ON b.id = e.batch_id
            WHERE e.account_id = ?1
              AND b.is_posted = 1
              AND (?2 IS NULL OR b.transaction_date >= ?2)
              AND (?3 IS NULL OR b.transaction_date <= ?3)
            ORDER BY b.transaction_date, b.created_at, b.batch_number, e.line_no
            "#,
        )
        .bind(account_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut running = opening_balance;
        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let debit = Money::from_minor(row.debit_minor);
            let credit = Money::from_minor(row.credit_minor);
            running = running
                .checked_add(account_type.signed_balance(debit, credit))
                .ok_or(IntegrityError::TotalsOverflow)?;

            lines.push(StatementLine {
                entry_id: row.entry_id,
                batch_id: row.batch_id,
                batch_number: row.batch_number,
                reference_type: row.reference_type,
                reference_id: row.reference_id,
                transaction_date: row.transaction_date,
                narration: row.narration,
                debit,
                credit,
                running_balance: running,
            });
        }

        debug!(code = %account.code, lines = lines.len(), "Account statement built");

        Ok(AccountStatement {
            account,
            from,
            to,
            opening_balance,
            lines,
            closing_balance: running,
        })
    }

    /// Net position of every account with activity, placed in its column.
    pub async fn trial_balance(&self, as_of: Option<NaiveDate>) -> LedgerResult<TrialBalance> {
        let totals = account_totals(&self.pool, None, as_of).await?;

        let mut rows = Vec::new();
        let mut total_debit = Money::zero();
        let mut total_credit = Money::zero();

        for t in totals {
            let net = Money::from_minor(t.debit_minor) - Money::from_minor(t.credit_minor);
            if net.is_zero() {
                continue;
            }
            let (debit, credit) = if net.is_positive() {
                (net, Money::zero())
            } else {
                (Money::zero(), -net)
            };

            total_debit = total_debit
                .checked_add(debit)
                .ok_or(IntegrityError::TotalsOverflow)?;
            total_credit = total_credit
                .checked_add(credit)
                .ok_or(IntegrityError::TotalsOverflow)?;

            rows.push(TrialBalanceRow {
                account_id: t.account_id,
                code: t.code,
                name: t.name,
                account_type: t.account_type,
                debit,
                credit,
            });
        }

        Ok(TrialBalance {
            as_of,
            rows,
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        })
    }

    /// Income against expenses over a period.
    pub async fn profit_and_loss(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<ProfitAndLoss> {
        let totals = account_totals(&self.pool, from, to).await?;

        let income = lines_of(&totals, AccountType::Income);
        let expenses = lines_of(&totals, AccountType::Expense);
        let total_income: Money = income.iter().map(|l| l.amount).sum();
        let total_expenses: Money = expenses.iter().map(|l| l.amount).sum();

        Ok(ProfitAndLoss {
            from,
            to,
            income,
            expenses,
            total_income,
            total_expenses,
            net_profit: total_income - total_expenses,
        })
    }

    /// Assets against liabilities plus equity as of a date.
    pub async fn balance_sheet(&self, as_of: Option<NaiveDate>) -> LedgerResult<BalanceSheet> {
        let totals = account_totals(&self.pool, None, as_of).await?;

        let assets = lines_of(&totals, AccountType::Asset);
        let liabilities = lines_of(&totals, AccountType::Liability);
        let equity = lines_of(&totals, AccountType::Equity);

        let income: Money = lines_of(&totals, AccountType::Income)
            .iter()
            .map(|l| l.amount)
            .sum();
        let expenses: Money = lines_of(&totals, AccountType::Expense)
            .iter()
            .map(|l| l.amount)
            .sum();
        let current_earnings = income - expenses;

        let total_assets: Money = assets.iter().map(|l| l.amount).sum();
        let total_liabilities: Money = liabilities.iter().map(|l| l.amount).sum();
        let total_equity = equity.iter().map(|l| l.amount).sum::<Money>() + current_earnings;

        Ok(BalanceSheet {
            as_of,
            assets,
            liabilities,
            equity,
            current_earnings,
            total_assets,
            total_liabilities,
            total_equity,
            is_balanced: total_assets == total_liabilities + total_equity,
        })
    }

    // -------------------------------------------------------------------------
    // Batches
    // -------------------------------------------------------------------------

    pub async fn get_batch_with_entries(&self, batch_id: &str) -> LedgerResult<BatchWithEntries> {
        let batch = self
            .batches
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.to_string()))?;
        let entries = self.entries.list_by_batch(&batch.id).await?;

        Ok(BatchWithEntries { batch, entries })
    }

    pub async fn list_batches(&self, filter: &BatchFilter) -> LedgerResult<Vec<JournalBatch>> {
        Ok(self.batches.list(filter).await?)
    }

    pub async fn find_active_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: &str,
    ) -> LedgerResult<Option<JournalBatch>> {
        Ok(self
            .batches
            .find_active_by_reference(reference_type, reference_id.trim())
            .await?)
    }
}

/// Non-zero report lines for one account type.
fn lines_of(totals: &[AccountTotals], account_type: AccountType) -> Vec<ReportLine> {
    totals
        .iter()
        .filter(|t| t.account_type == account_type)
        .map(AccountTotals::report_line)
        .filter(|line| !line.amount.is_zero())
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
