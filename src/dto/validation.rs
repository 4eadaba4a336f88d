//! Validation helpers for DTOs.

use validator::ValidationError;

const TEAM_NAME_MAX: usize = 64;
const MESSAGE_MAX: usize = 500;

/// Validates that a team name is non-blank and at most 64 characters.
pub fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("team_name_blank");
        err.message = Some("Team name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > TEAM_NAME_MAX {
        let mut err = ValidationError::new("team_name_length");
        err.message =
            Some(format!("Team name must be at most {TEAM_NAME_MAX} characters").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a notification message or answer is non-blank and at most
/// 500 characters.
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        let mut err = ValidationError::new("message_blank");
        err.message = Some("Message must not be blank".into());
        return Err(err);
    }

    if message.chars().count() > MESSAGE_MAX {
        let mut err = ValidationError::new("message_length");
        err.message = Some(format!("Message must be at most {MESSAGE_MAX} characters").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_valid() {
        assert!(validate_team_name("Team Rocket").is_ok());
        assert!(validate_team_name("a").is_ok());
    }

    #[test]
    fn test_validate_team_name_invalid() {
        assert!(validate_team_name("").is_err());
        assert!(validate_team_name("   ").is_err());
        assert!(validate_team_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message("meet at the fountain").is_ok());
        assert!(validate_message("").is_err());
        assert!(validate_message("\t\n").is_err());
        assert!(validate_message(&"x".repeat(501)).is_err());
    }
}
