/// Token issuance
///
/// Builds access and refresh claims for an account and signs them with the
/// process-wide codec.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::TokenCodec;
use crate::configuration::AuthSettings;
use crate::error::AuthError;

/// A signed token and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Access and refresh tokens minted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self {
            codec,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_settings(codec: Arc<TokenCodec>, settings: &AuthSettings) -> Self {
        Self::new(
            codec,
            settings.access_token_expiry,
            settings.refresh_token_expiry,
        )
    }

    pub fn issue_access_token(&self, account_id: Uuid) -> Result<IssuedToken, AuthError> {
        self.issue(account_id, TokenKind::Access, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, account_id: Uuid) -> Result<IssuedToken, AuthError> {
        self.issue(account_id, TokenKind::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, account_id: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue_access_token(account_id)?,
            refresh: self.issue_refresh_token(account_id)?,
        })
    }

    fn issue(&self, account_id: Uuid, kind: TokenKind, ttl: i64) -> Result<IssuedToken, AuthError> {
        let claims = Claims::new(account_id, self.codec.issuer(), kind, self.codec.now(), ttl)?;
        let token = self.codec.encode(&claims)?;

        tracing::debug!(account_id = %account_id, kind = %kind, exp = claims.exp, "Token issued");

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }
}
