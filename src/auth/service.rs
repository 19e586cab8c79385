/// Login, refresh and registration flows.
///
/// `AuthService` is the single place that decides who is allowed in. It is
/// built once at startup and shared read-only across workers.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::jwt::{SigningSecret, TokenCodec};
use crate::auth::password::{validate_password_strength, CredentialHasher};
use crate::clock::Clock;
use crate::configuration::AuthSettings;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::{AppError, AuthError, ConfigError};
use crate::validators::{is_valid_identifier, normalize_identifier};

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    codec: Arc<TokenCodec>,
    issuer: TokenIssuer,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: CredentialHasher,
        codec: Arc<TokenCodec>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            issuer,
        }
    }

    /// Wire the service from configuration.
    ///
    /// # Errors
    /// Returns a `ConfigError` for an empty secret or invalid windows
    pub fn from_settings(
        settings: &AuthSettings,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let secret = SigningSecret::new(&settings.secret)?;
        let codec = Arc::new(TokenCodec::new(&secret, settings.issuer.clone(), clock));
        let issuer = TokenIssuer::from_settings(codec.clone(), settings);

        Ok(Self::new(
            store,
            CredentialHasher::new(settings.hash_cost),
            codec,
            issuer,
        ))
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Current time as seen by token validation.
    pub fn now(&self) -> i64 {
        self.codec.now()
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown identifier and wrong password both yield `InvalidCredentials`.
    /// The identifier is normalized the same way registration stores it, but
    /// never validated here.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<TokenPair, AuthError> {
        let record = self
            .store
            .find_by_identifier(normalize_identifier(identifier))
            .await
            .map_err(|e| AuthError::AuthSystemError(e.to_string()))?;

        let record = match record {
            Some(record) => record,
            None => {
                tracing::debug!("Login rejected: unknown identifier");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.verify_password(&record.password_hash, password).await? {
            tracing::debug!(account_id = %record.account_id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issuer.issue_pair(record.account_id)?;
        tracing::info!(account_id = %record.account_id, "Login succeeded");
        Ok(pair)
    }

    /// Mint a fresh pair from a refresh token.
    ///
    /// The presented token stays valid until its own expiry; nothing is
    /// stored server-side to revoke it.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode_kind(refresh_token, TokenKind::Refresh)?;
        let account_id = claims.account_id()?;

        let pair = self.issuer.issue_pair(account_id)?;
        tracing::info!(account_id = %account_id, "Token pair refreshed");
        Ok(pair)
    }

    /// Claims of a valid access token.
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.codec.decode_kind(access_token, TokenKind::Access)
    }

    /// Create a credential record for a new account.
    pub async fn register(&self, identifier: &str, password: &str) -> Result<Uuid, AppError> {
        let identifier = is_valid_identifier(identifier)?;
        validate_password_strength(password)?;

        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::AuthSystemError(format!("Hashing task failed: {}", e)))??;

        let record = CredentialRecord::new(identifier, password_hash);
        let account_id = record.account_id;
        self.store.insert(record).await?;

        tracing::info!(account_id = %account_id, "Account registered");
        Ok(account_id)
    }

    // bcrypt is deliberately slow; keep it off the async workers
    async fn verify_password(&self, hash: &str, password: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let hash = hash.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| AuthError::AuthSystemError(format!("Verification task failed: {}", e)))
    }
}
