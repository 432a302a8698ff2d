//! # Repository Module
//!
//! Explicit, typed repositories per entity.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Kinds of Access                                  │
//! │                                                                         │
//! │  Reads (pool)                      Writes (inside a transaction)        │
//! │  ────────────                      ─────────────────────────────        │
//! │  db.accounts().get_by_code(..)     account::insert_if_absent(conn, ..)  │
//! │  db.batches().list(..)             batch::insert(conn, ..)              │
//! │  db.entries().list_by_batch(..)    entry::insert(conn, ..)              │
//! │  db.parties().get(..)              party::apply_balance_delta(conn, ..) │
//! │                                    sequence::next_value(conn, ..)       │
//! │                                                                         │
//! │  Write functions take `&mut SqliteConnection`, so the caller owns the   │
//! │  transaction boundary: a batch, its entries and every balance delta    │
//! │  commit or roll back together.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`] - Chart of accounts
//! - [`PartyRepository`] - Customer/supplier records and balance caches
//! - [`BatchRepository`] - Journal batches
//! - [`EntryRepository`] - Ledger entries
//! - [`SequenceRepository`] - Batch number / party code counters

pub mod account;
pub mod batch;
pub mod entry;
pub mod party;
pub mod sequence;

pub use account::{AccountFilter, AccountRepository};
pub use batch::{BatchFilter, BatchRepository};
pub use entry::EntryRepository;
pub use party::PartyRepository;
pub use sequence::SequenceRepository;
