/// Input validators for account registration
///
/// Login identifiers are usernames or email addresses. Length limits keep
/// lookups cheap; the character set keeps them printable and unambiguous.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_IDENTIFIER_LENGTH: usize = 3;
const MAX_IDENTIFIER_LENGTH: usize = 64;

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.@+-]+$").unwrap();
}

/// Canonical form of an identifier, shared by registration and login.
pub fn normalize_identifier(identifier: &str) -> &str {
    identifier.trim()
}

/// Validates a login identifier and returns it normalized.
pub fn is_valid_identifier(identifier: &str) -> Result<String, ValidationError> {
    let trimmed = normalize_identifier(identifier);

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.len() < MIN_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_IDENTIFIER_LENGTH,
        ));
    }

    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_IDENTIFIER_LENGTH,
        ));
    }

    if !IDENTIFIER_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "username may only contain letters, digits and _ . @ + -".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(is_valid_identifier("alice").unwrap(), "alice");
        assert_eq!(is_valid_identifier("  bob_99 ").unwrap(), "bob_99");
        assert!(is_valid_identifier("carol@example.com").is_ok());
    }

    #[test]
    fn test_normalize_matches_validation() {
        assert_eq!(normalize_identifier("  bob "), "bob");
        assert_eq!(
            normalize_identifier("  bob "),
            is_valid_identifier("  bob ").unwrap()
        );
    }

    #[test]
    fn test_empty_identifier() {
        assert_eq!(
            is_valid_identifier("   "),
            Err(ValidationError::EmptyField("username".to_string()))
        );
    }

    #[test]
    fn test_length_limits() {
        assert!(matches!(
            is_valid_identifier("ab"),
            Err(ValidationError::TooShort(_, 3))
        ));
        assert!(matches!(
            is_valid_identifier(&"a".repeat(65)),
            Err(ValidationError::TooLong(_, 64))
        ));
    }

    #[test]
    fn test_rejects_unexpected_characters() {
        let cases = vec!["al ice", "alice;--", "<script>", "alice\u{0}"];
        for case in cases {
            assert!(
                is_valid_identifier(case).is_err(),
                "should reject identifier {:?}",
                case
            );
        }
    }
}
