//! Credential and session storage
//!
//! The auth core only talks to storage through the two traits below, so any
//! engine offering the same semantics can stand in. PostgreSQL backs real
//! deployments; the in-memory stores back tests and database-less runs.

pub mod credentials;
pub mod memory;
pub mod sessions;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use credentials::PgCredentialStore;
pub use memory::{InMemoryCredentialStore, InMemorySessionStore};
pub use sessions::PgSessionStore;

/// Storage layer failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with the same primary key already exists
    #[error("record already exists")]
    Conflict,

    /// The record an update targeted does not exist
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stored identity record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Credential {
    pub email: String,
    pub user_id: Uuid,
    /// PHC-encoded hash carrying algorithm, cost parameters and salt
    pub password_hash: String,
    pub salt: String,
}

impl Credential {
    /// A row only counts once both the hash and the salt are populated.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        !self.password_hash.is_empty() && !self.salt.is_empty()
    }
}

/// Server-side session record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub session_token: String,
    pub user_id: Uuid,
    pub login_time: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a resolved credential by email or by user id.
    async fn lookup(&self, email_or_user_id: &str) -> Result<Option<Credential>, StoreError>;

    /// True only if `candidate` matches no existing user id and no existing salt.
    async fn is_identifier_unique(&self, candidate: &str) -> Result<bool, StoreError>;

    /// Insert a credential; [`StoreError::Conflict`] when the email is taken.
    async fn insert(&self, credential: &Credential) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `user_id`, replacing any session the user already has.
    async fn create(&self, user_id: Uuid, token: &str) -> Result<(), StoreError>;

    /// Swap in `new_token` and bump `last_seen`.
    ///
    /// Fails with [`StoreError::NotFound`] if the user has no session.
    async fn renew(&self, user_id: Uuid, new_token: &str) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Remove the session holding `token`. Missing sessions are not an error.
    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Sessions whose `last_seen` is at or before `now - threshold`.
    async fn list_expired(&self, threshold: Duration) -> Result<Vec<Session>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
