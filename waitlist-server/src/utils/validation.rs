//! Input validation helpers
//!
//! Centralized text length constants and validation functions. All checks
//! run before any state mutation; a rejected input never reaches storage.

use shared::waitlist::{MAX_PARTY_SIZE, MIN_PARTY_SIZE};

use crate::utils::AppError;
use crate::waitlist::WaitlistError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: restaurant, party contact name
pub const MAX_NAME_LEN: usize = 200;

/// Phone numbers in international notation
pub const MAX_PHONE_LEN: usize = 32;

/// Minimum digits a phone number must carry
pub const MIN_PHONE_DIGITS: usize = 5;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

// ── Validation helpers (check-in) ───────────────────────────────────

/// Validate the customer-supplied contact name.
pub fn validate_party_name(name: &str) -> Result<(), WaitlistError> {
    if name.trim().is_empty() {
        return Err(WaitlistError::Validation("name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(WaitlistError::Validation(format!(
            "name is too long ({} chars, max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    Ok(())
}

/// Validate a phone number: digits plus international punctuation,
/// carrying at least [`MIN_PHONE_DIGITS`] digits.
pub fn validate_phone(phone: &str) -> Result<(), WaitlistError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(WaitlistError::Validation("phone must not be empty".into()));
    }
    if trimmed.len() > MAX_PHONE_LEN {
        return Err(WaitlistError::Validation(format!(
            "phone is too long ({} chars, max {MAX_PHONE_LEN})",
            trimmed.len()
        )));
    }
    let valid_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    if !valid_chars || digits < MIN_PHONE_DIGITS {
        return Err(WaitlistError::Validation(format!(
            "malformed phone number: {trimmed}"
        )));
    }
    Ok(())
}

/// Validate the party size against the accepted range.
pub fn validate_party_size(party_size: i32) -> Result<(), WaitlistError> {
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&party_size) {
        return Err(WaitlistError::Validation(format!(
            "party_size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}, got {party_size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_accepts_international_notation() {
        assert!(validate_phone("+34 600 123 456").is_ok());
        assert!(validate_phone("(+49) 170-1234567").is_ok());
        assert!(validate_phone("600123456").is_ok());
    }

    #[test]
    fn test_phone_rejects_garbage() {
        assert!(validate_phone("").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("+34 600 123 456 ext. 9").is_err());
    }

    #[test]
    fn test_party_size_range() {
        assert!(validate_party_size(0).is_err());
        assert!(validate_party_size(1).is_ok());
        assert!(validate_party_size(20).is_ok());
        assert!(validate_party_size(21).is_err());
        assert!(validate_party_size(-3).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Mesa Uno", "name", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(201), "name", MAX_NAME_LEN).is_err());
    }
}
