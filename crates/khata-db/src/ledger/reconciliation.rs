//! # Balance Reconciliation
//!
//! Recomputes every balance from the entries and compares it with the
//! cached `current_balance_minor` columns. Drift is reported, never
//! repaired: a drifted cache means a write path bypassed `commit_batch`,
//! and overwriting it would hide that.
//!
//! ## Background Job
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reconciler::spawn(interval) ──► tokio task                             │
//! │                                    │                                    │
//! │                       ┌────────────┴────────────┐                       │
//! │                       ▼                         ▼                       │
//! │                 interval.tick()          shutdown_rx.recv()             │
//! │                 run_once()               exit loop                      │
//! │                 store last report                                       │
//! │                                                                         │
//! │  ReconcilerHandle: last_report(), shutdown()                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use khata_core::reports::{BalanceDrift, DriftSubject, ReconciliationReport};
use khata_core::{Money, PartyType};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::projection::account_totals;
use crate::error::LedgerResult;
use crate::repository::PartyRepository;

/// Cache reconciliation job.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
    parties: PartyRepository,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Reconciler {
            parties: PartyRepository::new(pool.clone()),
            pool,
        }
    }

    /// One full pass over accounts and parties. Read-only.
    pub async fn run_once(&self) -> LedgerResult<ReconciliationReport> {
        let totals = account_totals(&self.pool, None, None).await?;
        let mut report = ReconciliationReport::default();
        let mut by_party: HashMap<(PartyType, String), Money> = HashMap::new();

        for t in &totals {
            report.accounts_checked += 1;
            let derived = t.derived();
            let cached = Money::from_minor(t.current_balance_minor);

            if let (Some(party_type), Some(party_id)) = (t.party_type, t.party_id.as_ref()) {
                *by_party.entry((party_type, party_id.clone())).or_default() += derived;
            }

            if !cached.approx_eq(derived) {
                warn!(
                    code = %t.code,
                    cached = %cached,
                    derived = %derived,
                    "Account balance cache drifted"
                );
                report.drifts.push(BalanceDrift {
                    subject: DriftSubject::Account {
                        account_id: t.account_id.clone(),
                        code: t.code.clone(),
                    },
                    cached,
                    derived,
                });
            }
        }

        for party_type in [PartyType::Customer, PartyType::Supplier] {
            for party in self.parties.list(party_type).await? {
                report.parties_checked += 1;
                let cached = party.current_balance();
                let derived = by_party
                    .get(&(party_type, party.party_id.clone()))
                    .copied()
                    .unwrap_or_default();

                if !cached.approx_eq(derived) {
                    warn!(
                        %party_type,
                        party_id = %party.party_id,
                        cached = %cached,
                        derived = %derived,
                        "Party balance cache drifted"
                    );
                    report.drifts.push(BalanceDrift {
                        subject: DriftSubject::Party {
                            party_type,
                            party_id: party.party_id,
                        },
                        cached,
                        derived,
                    });
                }
            }
        }

        info!(
            accounts = report.accounts_checked,
            parties = report.parties_checked,
            drifts = report.drifts.len(),
            "Reconciliation pass complete"
        );
        Ok(report)
    }

    /// Runs [`Reconciler::run_once`] every `every` until shut down.
    pub fn spawn(self, every: Duration) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let last_report = Arc::new(RwLock::new(None));
        let slot = Arc::clone(&last_report);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.run_once().await {
                            Ok(report) => *slot.write().await = Some(report),
                            Err(e) => error!(?e, "Reconciliation pass failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Reconciler received shutdown");
                        break;
                    }
                }
            }
        });

        ReconcilerHandle {
            shutdown_tx,
            last_report,
            task,
        }
    }
}

/// Handle for a running reconciliation job.
pub struct ReconcilerHandle {
    shutdown_tx: mpsc::Sender<()>,
    last_report: Arc<RwLock<Option<ReconciliationReport>>>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// The report of the most recent successful pass.
    pub async fn last_report(&self) -> Option<ReconciliationReport> {
        self.last_report.read().await.clone()
    }

    /// Stops the job and waits for the current pass to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(?e, "Reconciler task ended abnormally");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
