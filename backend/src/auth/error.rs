//! Auth core error taxonomy

use crate::repositories::StoreError;
use thiserror::Error;

/// Outcome of a failed auth operation
///
/// `NotFound` and `Invalid` deliberately carry no detail: the caller must not
/// be able to tell an unknown email from a wrong password, or an expired
/// token from a forged one.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential or session absent, or the password did not match
    #[error("unauthenticated")]
    NotFound,

    /// Email already registered
    #[error("email already registered")]
    Conflict,

    /// Token failed signature, algorithm, expiry or claims checks
    #[error("invalid token")]
    Invalid,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage failure")]
    Store(#[source] StoreError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::Conflict,
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Store(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        assert!(matches!(AuthError::from(StoreError::Conflict), AuthError::Conflict));
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        assert!(matches!(AuthError::from(StoreError::NotFound), AuthError::NotFound));
    }

    #[test]
    fn test_database_error_stays_a_store_error() {
        let err = AuthError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(err.to_string(), "storage failure");
    }
}
