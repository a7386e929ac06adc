//! Input validation helpers
//!
//! Centralized text length constants and quantity checks shared by the
//! ledger actions.

use crate::ledger::traits::LedgerError;
use rust_decimal::Decimal;
use shared::procurement::CommandErrorCode;

// ── Text length limits ──────────────────────────────────────────────

/// Material names, operator names
pub const MAX_NAME_LEN: usize = 200;

/// Return reasons, abandonment notes
pub const MAX_NOTE_LEN: usize = 500;

/// Identifiers and units: request id, supplier id, unit of measure
pub const MAX_SHORT_TEXT_LEN: usize = 100;

// ── Text ────────────────────────────────────────────────────────────

/// Validate a required string (non-empty + max length).
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidOperation(
            CommandErrorCode::ValidationFailed,
            format!("{field} must not be empty"),
        ));
    }
    validate_text(value, field, max_len)
}

/// Validate a string against the length limit (empty allowed).
pub fn validate_text(value: &str, field: &str, max_len: usize) -> Result<(), LedgerError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(LedgerError::InvalidOperation(
            CommandErrorCode::ValidationFailed,
            format!("{field} is too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}

/// Validate an optional string, if present, against the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), LedgerError> {
    if let Some(v) = value {
        validate_text(v, field, max_len)?;
    }
    Ok(())
}

// ── Quantities ──────────────────────────────────────────────────────

/// Quantity must be strictly positive.
pub fn require_positive(quantity: Decimal, field: &str) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(format!(
            "{field} must be greater than zero, got {quantity}"
        )));
    }
    Ok(())
}

/// Quantity must be zero or positive.
pub fn require_non_negative(quantity: Decimal, field: &str) -> Result<(), LedgerError> {
    if quantity < Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(format!(
            "{field} must not be negative, got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_rejects_blank() {
        let err = validate_required_text("   ", "unit", MAX_SHORT_TEXT_LEN).unwrap_err();
        assert_eq!(err.code(), CommandErrorCode::ValidationFailed);
        assert!(validate_required_text("m3", "unit", MAX_SHORT_TEXT_LEN).is_ok());
    }

    #[test]
    fn test_text_length_counts_chars() {
        // Multi-byte characters count once
        let name = "ç".repeat(MAX_NAME_LEN);
        assert!(validate_text(&name, "material_name", MAX_NAME_LEN).is_ok());
        let too_long = "a".repeat(MAX_NOTE_LEN + 1);
        assert!(validate_optional_text(&Some(too_long), "reason", MAX_NOTE_LEN).is_err());
        assert!(validate_optional_text(&None, "reason", MAX_NOTE_LEN).is_ok());
    }

    #[test]
    fn test_quantity_checks() {
        assert!(require_positive(Decimal::ZERO, "quantity").is_err());
        assert!(require_positive(Decimal::new(5, 1), "quantity").is_ok());
        assert!(require_non_negative(Decimal::ZERO, "quantity").is_ok());
        assert!(matches!(
            require_non_negative(Decimal::NEGATIVE_ONE, "quantity"),
            Err(LedgerError::InvalidQuantity(_))
        ));
    }
}
