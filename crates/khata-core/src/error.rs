//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  ├── CoreError        - Wraps everything below                         │
//! │  ├── ValidationError  - Caller broke the contract (nothing written)    │
//! │  └── IntegrityError   - Construction bug (entry/batch invariant)       │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - What collaborators see                         │
//! │                                                                         │
//! │  Every LedgerError reports one ErrorKind:                              │
//! │     Validation │ Conflict │ Integrity │ NotFound                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (account, amounts, reference)
//! 3. Errors are enum variants, never String
//! 4. The ledger never produces UI text - collaborators map `ErrorKind`

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Structured classification of every ledger failure.
///
/// Collaborators branch on this, not on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller contract violation. Nothing was written; do not retry.
    Validation,
    /// Uniqueness race that could not be resolved locally.
    Conflict,
    /// Invariant violated during construction or commit. System error.
    Integrity,
    /// The referenced batch/account does not exist or is not in a usable state.
    NotFound,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Integrity error (wraps IntegrityError).
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    /// A monetary value does not fit in i64 minor units.
    ///
    /// ## When This Occurs
    /// - A decimal amount beyond ±92 quadrillion rupees
    /// - Price × quantity overflow
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl CoreError {
    /// Returns the structured kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) | CoreError::AmountOutOfRange(_) => ErrorKind::Validation,
            CoreError::Integrity(_) => ErrorKind::Integrity,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a collaborator's request doesn't meet the
/// posting contract. Detected before any write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A posting request needs at least this many lines.
    #[error("posting needs at least {min} lines, got {actual}")]
    TooFewLines { min: usize, actual: usize },

    /// A posting request has only debits or only credits.
    #[error("posting must contain both debit and credit lines")]
    SingleSided,

    /// Requested lines do not net to zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Order service: "debit Cash 118, credit Sales 100, credit Tax 17"
    ///      │
    ///      ▼
    /// Unbalanced { debit: ₹118.00, credit: ₹117.00 }
    ///      │
    ///      ▼
    /// Nothing written - the order service has a rounding bug to fix
    /// ```
    #[error("posting is not balanced: debit {debit}, credit {credit}")]
    Unbalanced { debit: Money, credit: Money },

    /// Target account has been deactivated.
    #[error("account {code} is inactive")]
    InactiveAccount { code: String },
}

// =============================================================================
// Integrity Error
// =============================================================================

/// Invariant violations that indicate a construction bug upstream.
///
/// These are never coerced into valid data: the operation fails and the
/// surrounding transaction is rolled back.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// An entry is neither a pure debit nor a pure credit.
    #[error("entry must be a debit XOR a credit (debit {debit}, credit {credit})")]
    EntrySide { debit: Money, credit: Money },

    /// An entry carries a negative amount.
    #[error("entry amounts cannot be negative (debit {debit}, credit {credit})")]
    NegativeAmount { debit: Money, credit: Money },

    /// A batch's entries do not sum to equal totals at commit time.
    #[error("batch {batch} is unbalanced: debit {debit}, credit {credit}")]
    BatchUnbalanced {
        batch: String,
        debit: Money,
        credit: Money,
    },

    /// Totals overflowed while summing a batch.
    #[error("batch totals overflowed")]
    TotalsOverflow,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalanced_message() {
        let err = ValidationError::Unbalanced {
            debit: Money::from_minor(11800),
            credit: Money::from_minor(11700),
        };
        assert_eq!(
            err.to_string(),
            "posting is not balanced: debit ₹118.00, credit ₹117.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "reference_id".to_string(),
        };
        assert_eq!(err.to_string(), "reference_id is required");

        let err = ValidationError::TooFewLines { min: 2, actual: 1 };
        assert_eq!(err.to_string(), "posting needs at least 2 lines, got 1");
    }

    #[test]
    fn test_kinds() {
        let validation: CoreError = ValidationError::SingleSided.into();
        assert_eq!(validation.kind(), ErrorKind::Validation);

        let integrity: CoreError = IntegrityError::TotalsOverflow.into();
        assert_eq!(integrity.kind(), ErrorKind::Integrity);

        assert_eq!(
            CoreError::AmountOutOfRange("x".into()).kind(),
            ErrorKind::Validation
        );
    }
}
