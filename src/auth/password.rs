/// Password Hashing and Verification
///
/// bcrypt hashes embed their own salt and cost, so verification needs
/// nothing but the stored string.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AuthError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// One-way password hasher with a fixed bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns `AuthSystemError` only if bcrypt itself fails (bad cost,
    /// entropy failure).
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        hash(password, self.cost)
            .map_err(|e| AuthError::AuthSystemError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash.
    ///
    /// A malformed hash is reported as a plain mismatch so callers cannot
    /// tell it apart from a wrong password.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        match verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }
}

/// Validate password strength requirements for new accounts
///
/// Requirements:
/// - 8 to 128 characters
/// - At least one digit, one lowercase letter and one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    // bcrypt only reads the first 72 bytes; the cap also bounds hashing work
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        ));
    }

    Ok(())
}
