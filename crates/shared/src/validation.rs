//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of an image reference (path or URL).
pub const MAX_IMAGE_REFERENCE_LENGTH: usize = 2048;

/// Shortest name an event may be renamed to, counted after trimming.
pub const MIN_RENAMED_EVENT_NAME_LENGTH: usize = 5;

/// Validates that a required text field is not empty or whitespace only.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a new event name on update: at least
/// [`MIN_RENAMED_EVENT_NAME_LENGTH`] characters once surrounding whitespace
/// is dropped.
pub fn validate_renamed_event_name(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() < MIN_RENAMED_EVENT_NAME_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some("Name must be 5-255 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates an event image reference.
///
/// The reference is an opaque storage path or URL; it must be non-blank,
/// contain no whitespace, and stay within [`MAX_IMAGE_REFERENCE_LENGTH`].
pub fn validate_image_reference(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("image_reference");
        err.message = Some("Image must be a path or URL without whitespace".into());
        return Err(err);
    }

    if value.len() > MAX_IMAGE_REFERENCE_LENGTH {
        let mut err = ValidationError::new("image_reference_length");
        err.message = Some("Image reference must be at most 2048 characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Tech Conference").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t\n").is_err());
    }

    #[test]
    fn test_validate_not_blank_error_message() {
        let err = validate_not_blank("").unwrap_err();
        assert_eq!(err.message.unwrap().to_string(), "This field is required");
    }

    #[test]
    fn test_validate_renamed_event_name_counts_trimmed_characters() {
        assert!(validate_renamed_event_name("Jazz Night").is_ok());
        assert!(validate_renamed_event_name("  Gala  ").is_err());
        assert!(validate_renamed_event_name("      ").is_err());
        assert!(validate_renamed_event_name("  Expo! ").is_ok());
    }

    #[test]
    fn test_validate_image_reference() {
        assert!(validate_image_reference("events/banner.png").is_ok());
        assert!(validate_image_reference(
            "https://images.unsplash.com/photo-1505373877841-8d25f7d46678?w=800&h=600&fit=crop"
        )
        .is_ok());
    }

    #[test]
    fn test_validate_image_reference_rejects_whitespace() {
        assert!(validate_image_reference("").is_err());
        assert!(validate_image_reference("my image.png").is_err());
    }

    #[test]
    fn test_validate_image_reference_length() {
        let long = format!("https://cdn.example.com/{}", "a".repeat(2048));
        let err = validate_image_reference(&long).unwrap_err();
        assert_eq!(err.code, "image_reference_length");
    }
}
