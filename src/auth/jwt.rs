/// JWT Encoding and Validation
///
/// Signs claims with HS256 and validates inbound tokens. HS256 is the only
/// accepted algorithm; the header is inspected before any signature work so
/// that `none` or asymmetric substitutions are reported as such.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, DecodeError, Engine as _};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::auth::claims::{Claims, TokenKind};
use crate::clock::Clock;
use crate::error::{AuthError, ConfigError};

const ACCEPTED_ALGORITHM: Algorithm = Algorithm::HS256;
const ACCEPTED_ALGORITHM_NAME: &str = "HS256";

/// Server-held HMAC key. Never empty.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// # Errors
    /// Returns `MissingRequired` if the secret is empty or only whitespace
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        let bytes = secret.as_ref();
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        Ok(Self(bytes.to_vec()))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

/// Encodes claims into signed tokens and decodes them back.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret, issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(ACCEPTED_ALGORITHM);
        // Timing is checked against the injected clock, not jsonwebtoken's
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iss", "exp"]);
        validation.set_issuer(&[issuer.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            clock,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Sign claims into a `header.payload.signature` string.
    ///
    /// Deterministic for identical claims.
    ///
    /// # Errors
    /// Returns `AuthSystemError` if serialization or signing fails
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(ACCEPTED_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::AuthSystemError(format!("Token signing failed: {}", e)))
    }

    /// Verify a token and return its claims.
    ///
    /// Checks run in order: structure, encoding, algorithm, signature,
    /// claims shape, then expiry and issuance time.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(AuthError::MalformedToken);
        }

        let header = decode_segment(segments[0])?;
        decode_segment(segments[1])?;
        decode_segment(segments[2])?;

        let header: RawHeader =
            serde_json::from_slice(&header).map_err(|_| AuthError::MalformedToken)?;
        match header.alg.as_deref() {
            Some(ACCEPTED_ALGORITHM_NAME) => {}
            Some(other) => return Err(AuthError::UnsupportedAlgorithm(other.to_string())),
            None => return Err(AuthError::UnsupportedAlgorithm("missing".to_string())),
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)?;

        claims.validate_shape()?;
        claims.validate_timing(self.clock.now())?;

        Ok(claims)
    }

    /// Decode and additionally require a token kind.
    pub fn decode_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        claims.expect_kind(kind)?;
        Ok(claims)
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| match e {
        DecodeError::InvalidPadding => AuthError::BadPadding,
        _ => AuthError::InvalidEncoding,
    })
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidToken => AuthError::MalformedToken,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
            AuthError::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::Base64(_) => AuthError::InvalidEncoding,
        ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::InvalidAudience => AuthError::InvalidClaims(err.to_string()),
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::AuthSystemError(format!("Token verification failed: {}", err)),
    }
}
