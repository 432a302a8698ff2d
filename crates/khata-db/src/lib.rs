//! # khata-db: Database Layer and Ledger Engines for Khata
//!
//! SQLite storage through sqlx, plus the engines that post, reverse and
//! project the double-entry journal.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                                  │
//! │                                                                         │
//! │  Invoice / payment / purchase service                                  │
//! │       │  PostingRequest (khata-core)                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Ledger     │    │ Repositories │  │   │
//! │  │   │   (pool.rs)   │    │   engines     │    │  (per table) │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │───►│ Posting       │───►│ accounts     │  │   │
//! │  │   │ LedgerConfig  │    │ Reversal      │    │ batches      │  │   │
//! │  │   │ Migrations    │    │ Projection    │    │ entries      │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   <platform data dir>/khata.db                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `khata.toml` + environment overrides
//! - [`pool`] - Connection pool creation and engine accessors
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and `LedgerError`
//! - [`repository`] - Per-table repositories
//! - [`ledger`] - Chart of accounts, posting, reversal, projection, reconciliation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_core::events::{self, SaleTotals};
//! use khata_db::{Database, LedgerConfig};
//!
//! let db = Database::open(&LedgerConfig::load_or_default(None)).await?;
//! db.chart().bootstrap().await?;
//!
//! let batch = db
//!     .posting()
//!     .post(&events::cash_sale(&order.id, &order.number, today, totals))
//!     .await?;
//!
//! // invoice deleted
//! db.reversal().reverse(&batch.id, "Invoice deleted").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, LedgerConfig, PostingSettings, ReconciliationSettings};
pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::{
    BalanceProjection, ChartOfAccounts, PostingEngine, Reconciler, ReconcilerHandle,
    ReversalEngine,
};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AccountFilter, AccountRepository, BatchFilter, BatchRepository, EntryRepository,
    PartyRepository, SequenceRepository,
};
