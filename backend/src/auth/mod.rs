//! Authentication primitives
//!
//! Argon2id credential hashing, HS256 session tokens, the auth error type and
//! the bearer-token extractor used by protected routes.

mod error;
mod jwt;
mod middleware;
mod password;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, SigningSecret, TokenService, ValidatedToken};
pub use middleware::{bearer_token, AuthUser, BearerToken};
pub use password::CredentialHasher;
