/// JWT Claims structure
///
/// Fixed-shape payload carried by every token this service signs. There is
/// no server-side copy: claims live only inside the signed token.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AuthError;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived, authorizes requests to protected routes
    Access,
    /// Long-lived, only exchangeable for a new token pair
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Token kind
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims issued at `now` that expire `ttl_seconds` later.
    ///
    /// # Errors
    /// Returns `AuthSystemError` if the expiry does not fit in an `i64`
    pub fn new(
        account_id: Uuid,
        issuer: impl Into<String>,
        kind: TokenKind,
        now: i64,
        ttl_seconds: i64,
    ) -> Result<Self, AuthError> {
        let exp = now.checked_add(ttl_seconds).ok_or_else(|| {
            AuthError::AuthSystemError(format!("token window of {}s overflows", ttl_seconds))
        })?;

        Ok(Self {
            sub: account_id.to_string(),
            iss: issuer.into(),
            kind,
            iat: now,
            exp,
        })
    }

    /// Parse the subject back into an account ID.
    ///
    /// # Errors
    /// Returns `InvalidClaims` if the subject is not a UUID
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::InvalidClaims("subject is not an account id".to_string()))
    }

    /// Expired strictly after `exp`; a token is still valid at `now == exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }

    pub fn is_issued_in_future(&self, now: i64) -> bool {
        self.iat > now
    }

    /// Structural checks that serde cannot express.
    pub(crate) fn validate_shape(&self) -> Result<(), AuthError> {
        if self.sub.trim().is_empty() {
            return Err(AuthError::InvalidClaims("subject is empty".to_string()));
        }
        Ok(())
    }

    /// Timing checks against the supplied clock reading.
    pub(crate) fn validate_timing(&self, now: i64) -> Result<(), AuthError> {
        if self.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }
        if self.is_issued_in_future(now) {
            return Err(AuthError::TokenNotYetValid);
        }
        Ok(())
    }

    /// Require a particular token kind.
    pub fn expect_kind(&self, expected: TokenKind) -> Result<(), AuthError> {
        if self.kind != expected {
            return Err(AuthError::WrongTokenKind {
                expected: expected.to_string(),
                found: self.kind.to_string(),
            });
        }
        Ok(())
    }
}
