//! Auth orchestration: register, login, authorize, refresh, logout
//!
//! Each operation walks Unauthenticated → CredentialVerified → SessionActive
//! → TokenValid and stops at the first failed step. Nothing is written to the
//! session store before the credential step succeeds.

use crate::auth::{AuthError, AuthResult, CredentialHasher, TokenService};
use crate::repositories::{Credential, CredentialStore, SessionStore};
use anyhow::anyhow;
use session_auth_shared::validate_email;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Attempts at drawing an unused user id / salt pair before giving up
const MAX_IDENTITY_ATTEMPTS: usize = 8;

/// Token handed back to the client after a successful auth operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_in: i64,
}

/// Composes the credential hasher, stores and token service
///
/// Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: CredentialHasher,
        tokens: TokenService,
    ) -> Self {
        Self {
            credentials,
            sessions,
            hasher,
            tokens,
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create a credential and an initial session
    ///
    /// Returns [`AuthError::Conflict`] if the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<IssuedToken> {
        validate_email(email).map_err(AuthError::Validation)?;

        let (user_id, salt) = self.allocate_identity().await?;
        let password_hash = self
            .hasher
            .derive_async(password.to_string(), salt.clone())
            .await?;

        let credential = Credential {
            email: email.to_string(),
            user_id,
            password_hash,
            salt,
        };
        self.credentials.insert(&credential).await.map_err(|e| {
            let err = AuthError::from(e);
            if matches!(err, AuthError::Conflict) {
                debug!("Registration rejected: email already registered");
            }
            err
        })?;

        let issued = self.start_session(user_id).await?;
        metrics::counter!("auth_register_total").increment(1);
        info!(%user_id, "User registered");
        Ok(issued)
    }

    /// Verify a password and start (or replace) the user's session
    ///
    /// Unknown email, malformed email and wrong password are all
    /// [`AuthError::NotFound`].
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<IssuedToken> {
        let credential = match self.find_credential(email).await? {
            Some(credential) => credential,
            None => {
                debug!("Login failed: no credential for email");
                metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
                return Err(AuthError::NotFound);
            }
        };

        let verified = self
            .hasher
            .verify_async(
                password.to_string(),
                credential.salt.clone(),
                credential.password_hash.clone(),
            )
            .await?;
        if !verified {
            debug!(user_id = %credential.user_id, "Login failed: password mismatch");
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            return Err(AuthError::NotFound);
        }

        let issued = self.start_session(credential.user_id).await?;
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = %credential.user_id, "User logged in");
        Ok(issued)
    }

    /// Resolve a bearer token to its user
    ///
    /// The token must pass signature and expiry checks and must still be the
    /// token recorded on that user's live session. Does not touch `last_seen`.
    pub async fn authorize(&self, token: &str) -> AuthResult<Uuid> {
        let claims = self.tokens.validate(token)?;

        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(AuthError::NotFound)?;

        if session.user_id != claims.user_id {
            warn!(
                claimed = %claims.user_id,
                session_user = %session.user_id,
                "Token subject does not match session owner"
            );
            return Err(AuthError::Invalid);
        }

        Ok(claims.user_id)
    }

    /// Swap a live token for a fresh one and bump the session's `last_seen`
    pub async fn refresh(&self, token: &str) -> AuthResult<IssuedToken> {
        let user_id = self.authorize(token).await?;

        let new_token = self.tokens.issue(user_id)?;
        self.sessions.renew(user_id, &new_token).await?;

        debug!(%user_id, "Session renewed");
        Ok(self.issued(user_id, new_token))
    }

    /// End the session behind `token`
    ///
    /// The token stays cryptographically valid until it expires but no longer
    /// authorizes anything.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        let user_id = self.authorize(token).await?;
        self.sessions.delete(token).await?;
        info!(%user_id, "User logged out");
        Ok(())
    }

    async fn find_credential(&self, email: &str) -> AuthResult<Option<Credential>> {
        if validate_email(email).is_err() {
            return Ok(None);
        }
        Ok(self.credentials.lookup(email).await?)
    }

    async fn start_session(&self, user_id: Uuid) -> AuthResult<IssuedToken> {
        let token = self.tokens.issue(user_id)?;
        self.sessions.create(user_id, &token).await?;
        Ok(self.issued(user_id, token))
    }

    fn issued(&self, user_id: Uuid, token: String) -> IssuedToken {
        IssuedToken {
            token,
            user_id,
            expires_in: self.tokens.ttl_secs(),
        }
    }

    /// Draw a user id and salt that collide with nothing already stored
    async fn allocate_identity(&self) -> AuthResult<(Uuid, String)> {
        for attempt in 1..=MAX_IDENTITY_ATTEMPTS {
            let user_id = Uuid::new_v4();
            let salt = CredentialHasher::generate_salt()?;

            if self
                .credentials
                .is_identifier_unique(&user_id.to_string())
                .await?
                && self.credentials.is_identifier_unique(&salt).await?
            {
                return Ok((user_id, salt));
            }
            warn!(attempt, "Generated identifier collided with an existing credential");
        }

        Err(AuthError::Internal(anyhow!(
            "no unique identifier after {} attempts",
            MAX_IDENTITY_ATTEMPTS
        )))
    }
}
