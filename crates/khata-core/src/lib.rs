//! # khata-core: Pure Ledger Logic for Khata
//!
//! This crate is the **heart** of Khata's double-entry bookkeeping. It holds
//! every rule that can be checked without touching storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Khata Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Collaborators (order / payment / purchase services)      │   │
//! │  │     cash_sale ──► credit_sale ──► customer_receipt ──► ...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ PostingRequest                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  posting  │  │ validation│  │   │
//! │  │   │  Account  │  │   Money   │  │  Request  │  │   rules   │  │   │
//! │  │   │  Batch    │  │  TaxRate  │  │  Plan     │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Ledger Engines)                    │   │
//! │  │     Chart of Accounts, Posting, Reversal, Balances (SQLite)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Account, JournalBatch, LedgerEntry, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types and the structured [`ErrorKind`]
//! - [`validation`] - Field validation
//! - [`posting`] - Posting requests, plans and entry invariants
//! - [`events`] - Requests for the standard business events
//! - [`reports`] - Statement, trial balance, P&L and balance sheet shapes
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::money::Money;
//! use khata_core::types::TaxRate;
//!
//! // Create money from paise (never from floats!)
//! let subtotal = Money::from_minor(10000); // ₹100.00
//!
//! // 18% GST, rounded half away from zero
//! let gst = subtotal.calculate_tax(TaxRate::from_bps(1800)).unwrap();
//! assert_eq!(gst.minor(), 1800);
//! assert_eq!((subtotal + gst).to_string(), "₹118.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod money;
pub mod posting;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, IntegrityError, ValidationError};
pub use money::Money;
pub use posting::{AccountRole, BatchTotals, EntryDraft, PostingPlan, PostingRequest};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// A batch needs at least one debit and one credit line.
pub const MIN_POSTING_LINES: usize = 2;

/// Maximum length of a batch description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of a single line's narration.
pub const MAX_NARRATION_LEN: usize = 255;

/// Maximum length of account and party names.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of collaborator-side ids (order, payment, party).
pub const MAX_REFERENCE_ID_LEN: usize = 100;

/// Prefix of every batch number: `JB-INV-000123`.
pub const BATCH_NUMBER_PREFIX: &str = "JB";

/// Zero-padded width of the numeric part of batch numbers.
pub const SEQUENCE_WIDTH: usize = 6;

/// Minimum zero-padded width of party sub-account suffixes: `1300-004`.
pub const PARTY_CODE_WIDTH: usize = 3;
