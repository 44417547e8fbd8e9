//! Session token issuance and validation
//!
//! Tokens are HS256 JWTs signed with a secret that exists only in this
//! process's memory. Restarting the process therefore invalidates every
//! outstanding token.

use super::error::{AuthError, AuthResult};
use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret, SecretVec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Length of a generated signing secret
const SECRET_BYTES: usize = 64;

/// The one algorithm tokens may be signed with
const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Symmetric signing secret
pub struct SigningSecret(SecretVec<u8>);

impl SigningSecret {
    /// Fresh secret from the OS CSPRNG. Call once at startup.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(Secret::new(bytes))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Secret::new(bytes))
    }

    fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Random per-token id; keeps same-second tokens distinct
    pub jti: String,
}

/// Claims of a token that passed signature and expiry checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens
///
/// Keys are derived once in [`TokenService::new`] and shared through `Arc`,
/// so clones are cheap.
#[derive(Clone)]
pub struct TokenService {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &SigningSecret, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.expose())),
            decoding: Arc::new(DecodingKey::from_secret(secret.expose())),
            validation: Arc::new(validation),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Token lifetime in seconds
    #[inline]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a token for `user_id` expiring one TTL from now
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (issued_at + self.ttl).timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to sign token: {}", e))
    }

    /// Check signature, algorithm and expiry
    ///
    /// Every failure collapses to [`AuthError::Invalid`]; the cause is only
    /// logged at debug level.
    pub fn validate(&self, token: &str) -> AuthResult<ValidatedToken> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| reject(&format!("{:?}", e.kind())))?
            .claims;

        if claims.exp <= Utc::now().timestamp() {
            return Err(reject("expired"));
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| reject("subject is not a user id"))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| reject("exp out of range"))?;

        Ok(ValidatedToken {
            user_id,
            expires_at,
        })
    }
}

fn reject(reason: &str) -> AuthError {
    debug!(reason, "Token rejected");
    metrics::counter!("auth_token_rejected_total").increment(1);
    AuthError::Invalid
}
