//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a player id is non-blank and free of control characters.
///
/// # Examples
///
/// ```ignore
/// validate_player_id("tg:12345") // Ok
/// validate_player_id("   ")      // Err - blank
/// validate_player_id("a\nb")     // Err - control character
/// ```
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("player_id_blank");
        err.message = Some("Player ID must not be blank".into());
        return Err(err);
    }

    if id.chars().any(char::is_control) {
        let mut err = ValidationError::new("player_id_format");
        err.message = Some("Player ID must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}
