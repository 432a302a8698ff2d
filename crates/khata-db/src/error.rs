//! # Database Error Types
//!
//! Error types for database operations and for the ledger engines.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization (unique / busy / fk)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError ← Also wraps ValidationError / IntegrityError             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorKind ← What collaborators branch on                              │
//! │     Validation │ Conflict │ Integrity │ NotFound                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use khata_core::{CoreError, ErrorKind, IntegrityError, ReferenceType, ValidationError};
use thiserror::Error;

// =============================================================================
// Database Error
// =============================================================================

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and retry decisions.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two postings racing for the same (reference_type, reference_id)
    /// - Batch number collision
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// SQLite could not take the write lock in time.
    ///
    /// ## When This Occurs
    /// - Concurrent writers exceeded `busy_timeout`
    /// - A deferred transaction could not upgrade to a write transaction
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (including append-only trigger aborts).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// Configuration file could not be written.
    #[error("Failed to save configuration: {0}")]
    ConfigSaveFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether re-running the operation (after re-checking state) can succeed.
    ///
    /// ```text
    /// UniqueViolation  → yes (lost a race; the winner's row now exists)
    /// Busy             → yes (SQLite serialization failure)
    /// PoolExhausted    → yes
    /// everything else  → no
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. } | DbError::Busy(_) | DbError::PoolExhausted
        )
    }
}

/// SQLite primary result codes for lock contention (extended codes keep the
/// primary code in the low byte).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_lock_contention(code: Option<&str>, msg: &str) -> bool {
    let by_code = code
        .and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false);
    by_code || msg.contains("database is locked") || msg.contains("database is busy")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze code/message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_lock_contention(db_err.code().as_deref(), msg) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for DbError {
    fn from(err: toml::ser::Error) -> Self {
        DbError::ConfigSaveFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// The error every ledger operation returns.
///
/// Each variant reports exactly one [`ErrorKind`] through [`LedgerError::kind`].
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller contract violation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Construction bug detected at commit. Transaction rolled back.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// An amount does not fit in i64 paise.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// A system account is absent: bootstrap never ran.
    #[error("System account {code} not found; run bootstrap first")]
    SystemAccountMissing { code: String },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Journal batch not found: {0}")]
    BatchNotFound(String),

    /// No active batch exists for a business document.
    #[error("No active batch for {reference_type} {reference_id}")]
    ReferenceNotFound {
        reference_type: ReferenceType,
        reference_id: String,
    },

    #[error("Journal batch {0} is already reversed")]
    AlreadyReversed(String),

    #[error("Journal batch {0} is not posted")]
    NotPosted(String),

    /// System accounts cannot be deleted or deactivated.
    #[error("System account {0} cannot be removed or deactivated")]
    SystemAccountProtected(String),

    /// Accounts referenced by entries cannot be deleted.
    #[error("Account {0} has ledger entries and cannot be deleted")]
    AccountInUse(String),

    /// A uniqueness race or lock contention outlasted the retry budget.
    #[error("Conflict posting {reference}: gave up after {attempts} attempts")]
    Conflict { reference: String, attempts: u32 },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl LedgerError {
    /// Structured classification for collaborators.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::AmountOutOfRange(_)
            | LedgerError::SystemAccountProtected(_)
            | LedgerError::AccountInUse(_) => ErrorKind::Validation,

            LedgerError::Integrity(_) | LedgerError::SystemAccountMissing { .. } => {
                ErrorKind::Integrity
            }

            LedgerError::AccountNotFound(_)
            | LedgerError::BatchNotFound(_)
            | LedgerError::ReferenceNotFound { .. }
            | LedgerError::AlreadyReversed(_)
            | LedgerError::NotPosted(_) => ErrorKind::NotFound,

            LedgerError::Conflict { .. } => ErrorKind::Conflict,

            LedgerError::Database(db) => match db {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                err if err.is_retryable() => ErrorKind::Conflict,
                _ => ErrorKind::Integrity,
            },
        }
    }

    /// Whether the posting loop should re-run its idempotency check.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Database(db) if db.is_retryable())
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => LedgerError::Validation(e),
            CoreError::Integrity(e) => LedgerError::Integrity(e),
            CoreError::AmountOutOfRange(what) => LedgerError::AmountOutOfRange(what),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Database(err.into())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
