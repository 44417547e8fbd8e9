//! Credential repository for database operations

use super::{Credential, CredentialStore, StoreError};
use crate::db;
use async_trait::async_trait;
use sqlx::PgPool;

/// Primary key on `credentials.email`
const EMAIL_PRIMARY_KEY: &str = "credentials_pkey";

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn lookup(&self, email_or_user_id: &str) -> Result<Option<Credential>, StoreError> {
        let credential = sqlx::query_as::<_, Credential>(
            r#"
            SELECT email, user_id, password_hash, salt
            FROM credentials
            WHERE email = $1 OR user_id::text = $1
            LIMIT 1
            "#,
        )
        .bind(email_or_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential.filter(Credential::is_resolved))
    }

    async fn is_identifier_unique(&self, candidate: &str) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM credentials
                WHERE user_id::text = $1 OR salt = $1
            )
            "#,
        )
        .bind(candidate)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }

    async fn insert(&self, credential: &Credential) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO credentials (email, user_id, password_hash, salt)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&credential.email)
        .bind(credential.user_id)
        .bind(&credential.password_hash)
        .bind(&credential.salt)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e))
                if e.is_unique_violation() && e.constraint() == Some(EMAIL_PRIMARY_KEY) =>
            {
                Err(StoreError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        db::health_check(&self.pool).await
    }
}
