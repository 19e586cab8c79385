/// Error Handling Module
///
/// Unified error handling for the login service:
/// 1. Domain-specific error types (auth, validation, storage, configuration)
/// 2. A single application error type used for control flow
/// 3. HTTP response mapping with structured logging, one line per failure
///    under the same id the client receives

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Authentication errors.
///
/// Token decode failures keep their precise kind so they can be logged, but
/// every kind except `InvalidCredentials` and `AuthSystemError` collapses to a
/// generic 401 at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Malformed token")]
    MalformedToken,
    #[error("Token segment has bad base64 padding")]
    BadPadding,
    #[error("Token segment is not valid base64url")]
    InvalidEncoding,
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    #[error("Wrong token kind: expected {expected}, found {found}")]
    WrongTokenKind { expected: String, found: String },
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Authentication system error: {0}")]
    AuthSystemError(String),
}

impl AuthError {
    /// Stable code used in logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::BadPadding => "BAD_PADDING",
            AuthError::InvalidEncoding => "INVALID_ENCODING",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::UnsupportedAlgorithm(_) => "UNSUPPORTED_ALGORITHM",
            AuthError::InvalidClaims(_) => "INVALID_CLAIMS",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            AuthError::WrongTokenKind { .. } => "WRONG_TOKEN_KIND",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::AuthSystemError(_) => "AUTH_SYSTEM_ERROR",
        }
    }

    /// `AuthSystemError` is the only kind that is the server's fault.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, AuthError::AuthSystemError(_))
    }

    /// True for expiry and issuance-time failures, as opposed to
    /// cryptographic or structural ones.
    pub fn is_timing(&self) -> bool {
        matches!(self, AuthError::TokenExpired | AuthError::TokenNotYetValid)
    }
}

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Credential persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Identifier already registered: {0}")]
    Duplicate(String),
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
    #[error("Credential store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Configuration errors. Any of these is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
    #[error("Config parse error: {0}")]
    Parse(#[from] config::ConfigError),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
/// Single code for every unauthenticated response, whatever the cause.
pub const UNAUTHORIZED_CODE: &str = "UNAUTHORIZED";

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Store(e) => match e {
                StoreError::Duplicate(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY",
                    "Username is already taken".to_string(),
                ),
                StoreError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                ),
                StoreError::Backend(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    INVALID_CREDENTIALS_MESSAGE.to_string(),
                ),
                AuthError::AuthSystemError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    UNAUTHORIZED_CODE,
                    UNAUTHORIZED_MESSAGE.to_string(),
                ),
            },
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.status_and_message();
        let body = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        (status, body)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Store(StoreError::Duplicate(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Credential store error");
            }
            AppError::Auth(e) if e.is_server_fault() => {
                tracing::error!(request_id = request_id, error = %e, "Authentication system error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) if e.is_timing() => {
                tracing::info!(
                    request_id = request_id,
                    kind = e.code(),
                    "Token outside its validity window"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    kind = e.code(),
                    "Authentication error"
                );
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &request_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.status_and_message().0
    }
}
