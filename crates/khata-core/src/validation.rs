//! # Validation Module
//!
//! Input validation for everything a collaborator hands the ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Collaborator (order / payment / purchase service)            │
//! │  └── Derives lines from its own totals                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: khata-core                                                   │
//! │  ├── THIS MODULE: field rules (codes, names, ids, text lengths)        │
//! │  └── posting.rs: line rules (sides, positivity, balance)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (debit XOR credit)                                          │
//! │  ├── UNIQUE (code), UNIQUE (party_type, party_id)                      │
//! │  └── Partial UNIQUE (reference_type, reference_id)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every validator trims before checking and never touches storage.

use crate::error::ValidationError;
use crate::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_NARRATION_LEN, MAX_REFERENCE_ID_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Chart of Accounts
// =============================================================================

/// Validates an account code.
///
/// ## Rules
/// - Must not be empty, at most 20 characters
/// - Digits and hyphens only ("1100", "1300-004")
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_account_code;
///
/// assert!(validate_account_code("1300-004").is_ok());
/// assert!(validate_account_code("CASH").is_err());
/// ```
pub fn validate_account_code(code: &str) -> ValidationResult<()> {
    required("code", code)?;
    max_len("code", code, 20)?;

    let code = code.trim();
    if !code.chars().all(|c| c.is_ascii_digit() || c == '-')
        || code.starts_with('-')
        || code.ends_with('-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only digits and inner hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates an account or party display name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    required(field, name)?;
    max_len(field, name, MAX_NAME_LEN)
}

/// Validates a collaborator-side party identifier.
pub fn validate_party_id(party_id: &str) -> ValidationResult<()> {
    required("party_id", party_id)?;
    max_len("party_id", party_id, MAX_REFERENCE_ID_LEN)
}

// =============================================================================
// Posting Metadata
// =============================================================================

/// Validates the business reference of a posting.
///
/// `None` is accepted here; whether a reference is mandatory depends on the
/// reference type and is checked by the posting request.
pub fn validate_reference_id(reference_id: Option<&str>) -> ValidationResult<()> {
    match reference_id {
        Some(id) => {
            required("reference_id", id)?;
            max_len("reference_id", id, MAX_REFERENCE_ID_LEN)
        }
        None => Ok(()),
    }
}

/// Validates an optional batch description.
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(text) => max_len("description", text, MAX_DESCRIPTION_LEN),
        None => Ok(()),
    }
}

/// Validates an optional line narration.
pub fn validate_narration(narration: Option<&str>) -> ValidationResult<()> {
    match narration {
        Some(text) => max_len("narration", text, MAX_NARRATION_LEN),
        None => Ok(()),
    }
}

/// Validates a UUID string (account and batch ids).
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_uuid;
///
/// assert!(validate_uuid("batch_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("batch_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    required(field, id)?;

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_account_code() {
        assert!(validate_account_code("1100").is_ok());
        assert!(validate_account_code("2100-017").is_ok());

        assert!(validate_account_code("").is_err());
        assert!(validate_account_code("  ").is_err());
        assert!(validate_account_code("11A0").is_err());
        assert!(validate_account_code("-1100").is_err());
        assert!(validate_account_code(&"1".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Sharma Traders").is_ok());
        assert!(matches!(
            validate_name("name", " "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_name("name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_reference_and_text() {
        assert!(validate_reference_id(None).is_ok());
        assert!(validate_reference_id(Some("ORD-1")).is_ok());
        assert!(validate_reference_id(Some("")).is_err());

        assert!(validate_description(Some(&"d".repeat(MAX_DESCRIPTION_LEN))).is_ok());
        assert!(matches!(
            validate_description(Some(&"d".repeat(MAX_DESCRIPTION_LEN + 1))),
            Err(ValidationError::TooLong { max, .. }) if max == MAX_DESCRIPTION_LEN
        ));
        assert!(validate_narration(None).is_ok());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }

    #[test]
    fn test_validate_party_id() {
        assert!(validate_party_id("42").is_ok());
        assert!(validate_party_id("").is_err());
    }
}
