//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum length accepted for player names after trimming.
const MAX_NAME_LEN: usize = 20;

/// Validates that a join code is exactly 4 ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("4217") // Ok
/// validate_room_code("421")  // Err - too short
/// validate_room_code("42a7") // Err - non-digit
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 4 {
        let mut err = ValidationError::new("room_code_length");
        err.message =
            Some(format!("Room code must be exactly 4 digits (got {})", code.len()).into());
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a display name: non-empty after trimming, at most 20 characters,
/// no control characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_empty");
        err.message = Some("Player name must not be empty".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message =
            Some(format!("Player name must be at most {MAX_NAME_LEN} characters").into());
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("player_name_format");
        err.message = Some("Player name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_code_valid() {
        assert!(validate_room_code("0000").is_ok());
        assert!(validate_room_code("4217").is_ok());
        assert!(validate_room_code("9999").is_ok());
    }

    #[test]
    fn test_validate_room_code_invalid_length() {
        assert!(validate_room_code("421").is_err()); // too short
        assert!(validate_room_code("42170").is_err()); // too long
        assert!(validate_room_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_room_code_invalid_format() {
        assert!(validate_room_code("42a7").is_err()); // letter
        assert!(validate_room_code("4 17").is_err()); // space
        assert!(validate_room_code("-417").is_err()); // sign
    }

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Ava").is_ok());
        assert!(validate_player_name("  Ben  ").is_ok()); // trimmed
        assert!(validate_player_name("Jean-Luc 2").is_ok());
    }

    #[test]
    fn test_validate_player_name_invalid() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err()); // whitespace only
        assert!(validate_player_name("a".repeat(21).as_str()).is_err()); // too long
        assert!(validate_player_name("bad\u{0007}name").is_err()); // control char
    }
}
