//! In-memory stores
//!
//! Used by the test suite and by `storage.backend = "memory"` deployments.
//! Every trait call takes the lock once, which gives the same
//! one-statement atomicity the SQL store gets from Postgres.

use super::{Credential, CredentialStore, Session, SessionStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Credentials keyed by email
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials, resolved or not
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, email_or_user_id: &str) -> Result<Option<Credential>, StoreError> {
        let rows = self.rows.read().await;
        let found = rows.get(email_or_user_id).or_else(|| {
            rows.values()
                .find(|c| c.user_id.to_string() == email_or_user_id)
        });

        Ok(found.filter(|c| c.is_resolved()).cloned())
    }

    async fn is_identifier_unique(&self, candidate: &str) -> Result<bool, StoreError> {
        let rows = self.rows.read().await;
        Ok(!rows
            .values()
            .any(|c| c.user_id.to_string() == candidate || c.salt == candidate))
    }

    async fn insert(&self, credential: &Credential) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&credential.email) {
            return Err(StoreError::Conflict);
        }
        rows.insert(credential.email.clone(), credential.clone());
        Ok(())
    }
}

#[derive(Default)]
struct SessionTable {
    by_user: HashMap<Uuid, Session>,
    by_token: HashMap<String, Uuid>,
}

impl SessionTable {
    fn upsert(&mut self, session: Session) {
        if let Some(previous) = self.by_user.get(&session.user_id) {
            self.by_token.remove(&previous.session_token);
        }
        self.by_token
            .insert(session.session_token.clone(), session.user_id);
        self.by_user.insert(session.user_id, session);
    }
}

/// Sessions keyed by user id, with a token index
#[derive(Default)]
pub struct InMemorySessionStore {
    table: RwLock<SessionTable>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_user.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.by_user.is_empty()
    }

    /// Current session for a user, if any
    pub async fn get(&self, user_id: Uuid) -> Option<Session> {
        self.table.read().await.by_user.get(&user_id).cloned()
    }

    /// Overwrite `last_seen` for a user's session.
    ///
    /// Lets fixtures age a session without waiting out the inactivity threshold.
    pub async fn set_last_seen(&self, user_id: Uuid, last_seen: DateTime<Utc>) -> bool {
        match self.table.write().await.by_user.get_mut(&user_id) {
            Some(session) => {
                session.last_seen = last_seen;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        self.table.write().await.upsert(Session {
            session_token: token.to_string(),
            user_id,
            login_time: now,
            last_seen: now,
        });
        Ok(())
    }

    async fn renew(&self, user_id: Uuid, new_token: &str) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let mut session = table
            .by_user
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        session.session_token = new_token.to_string();
        session.last_seen = Utc::now();
        table.upsert(session);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let table = self.table.read().await;
        Ok(table
            .by_token
            .get(token)
            .and_then(|user_id| table.by_user.get(user_id))
            .cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        if let Some(user_id) = table.by_token.remove(token) {
            table.by_user.remove(&user_id);
        }
        Ok(())
    }

    async fn list_expired(&self, threshold: Duration) -> Result<Vec<Session>, StoreError> {
        let cutoff = Utc::now() - threshold;
        let table = self.table.read().await;
        let mut expired: Vec<Session> = table
            .by_user
            .values()
            .filter(|s| s.last_seen <= cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.last_seen);
        Ok(expired)
    }
}
