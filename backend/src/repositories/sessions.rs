//! Session repository for database operations

use super::{Session, SessionStore, StoreError};
use crate::db;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed session store
///
/// `sessions.user_id` is the primary key, so each statement below touches at
/// most one row per user and Postgres row locking covers concurrent logins.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (session_token, user_id, login_time, last_seen)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                session_token = EXCLUDED.session_token,
                login_time = EXCLUDED.login_time,
                last_seen = EXCLUDED.last_seen
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn renew(&self, user_id: Uuid, new_token: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET session_token = $2, last_seen = $3
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(new_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT session_token, user_id, login_time, last_seen
            FROM sessions
            WHERE session_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_expired(&self, threshold: Duration) -> Result<Vec<Session>, StoreError> {
        let cutoff = Utc::now() - threshold;
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT session_token, user_id, login_time, last_seen
            FROM sessions
            WHERE last_seen <= $1
            ORDER BY last_seen
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        db::health_check(&self.pool).await
    }
}
