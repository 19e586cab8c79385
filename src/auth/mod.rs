/// Authentication module
///
/// Password hashing, token signing/validation, token issuance and the
/// login/refresh flows built on them.

mod claims;
mod issuer;
mod jwt;
mod password;
mod service;

pub use claims::{Claims, TokenKind};
pub use issuer::{IssuedToken, TokenIssuer, TokenPair};
pub use jwt::{SigningSecret, TokenCodec};
pub use password::{validate_password_strength, CredentialHasher};
pub use service::AuthService;
