//! # Ledger Engines
//!
//! The double-entry core on top of the repositories.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PostingRequest ──► PostingEngine ──┐                                   │
//! │                          │          │                                   │
//! │                          ▼          ▼                                   │
//! │                  ChartOfAccounts   commit_batch ◄── ReversalEngine      │
//! │                  (role → account)  (one transaction per batch)          │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                    journal_batches / ledger_entries (append-only)       │
//! │                                         │                               │
//! │                    ┌────────────────────┴───────────────┐               │
//! │                    ▼                                    ▼               │
//! │            BalanceProjection                       Reconciler           │
//! │            (derived balances, reports)             (cache vs derived)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod chart;
mod commit;
mod posting;
mod projection;
mod reconciliation;
mod reversal;

pub use chart::ChartOfAccounts;
pub use posting::PostingEngine;
pub use projection::BalanceProjection;
pub use reconciliation::{Reconciler, ReconcilerHandle};
pub use reversal::ReversalEngine;

use std::future::Future;
use tracing::warn;

use crate::config::PostingSettings;
use crate::error::{LedgerError, LedgerResult};

/// Runs `op` until it succeeds, fails for good, or the retry budget runs out.
///
/// Only lock contention and unique-index collisions are retried; each attempt
/// starts from scratch, so the idempotency check runs again.
pub(crate) async fn with_retries<T, F, Fut>(
    settings: &PostingSettings,
    reference: &str,
    mut op: F,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_retryable() => {
                if attempt > settings.max_retries {
                    warn!(reference, attempts = attempt, error = %err, "Giving up after retries");
                    return Err(LedgerError::Conflict {
                        reference: reference.to_string(),
                        attempts: attempt,
                    });
                }
                warn!(reference, attempt, error = %err, "Retryable conflict, retrying");
                tokio::time::sleep(settings.backoff(attempt)).await;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> PostingSettings {
        PostingSettings {
            max_retries: 2,
            retry_backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retries(&fast(), "INVOICE o-1", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LedgerError::Database(DbError::Busy("database is locked".into())))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_conflict() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: LedgerResult<()> = with_retries(&fast(), "INVOICE o-1", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Database(DbError::PoolExhausted))
        })
        .await;

        assert!(matches!(result, Err(LedgerError::Conflict { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: LedgerResult<()> = with_retries(&fast(), "INVOICE o-1", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::BatchNotFound("b-1".into()))
        })
        .await;

        assert!(matches!(result, Err(LedgerError::BatchNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
