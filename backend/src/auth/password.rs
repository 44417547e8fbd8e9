//! Password hashing using argon2
//!
//! Each credential carries its own random salt, stored next to the hash. The
//! derived hash is kept in PHC form (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`)
//! so the work factors travel with it.
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU- and memory-intensive. From async code use the
//! `_async` variants, which run on the blocking thread pool.

use crate::config::HasherConfig;
use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Raw salt length before B64 encoding
const SALT_BYTES: usize = 32;

/// Derives and verifies Argon2id password hashes
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(config: &HasherConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| anyhow!("Invalid argon2 parameters: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Fresh random salt from the OS CSPRNG, B64 encoded
    pub fn generate_salt() -> Result<String> {
        let mut bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let salt = SaltString::encode_b64(&bytes)
            .map_err(|e| anyhow!("Failed to encode salt: {}", e))?;
        Ok(salt.as_str().to_string())
    }

    /// Derive the encoded hash for `password` under `salt` (blocking)
    pub fn derive(&self, password: &str, salt: &str) -> Result<String> {
        let salt = SaltString::from_b64(salt).map_err(|e| anyhow!("Invalid salt: {}", e))?;
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored hash (blocking)
    ///
    /// The hash must have been derived under `salt`; a hash embedding any
    /// other salt never verifies. Cost parameters are read from the hash
    /// itself. A malformed stored hash is an error rather than `false`.
    pub fn verify(&self, password: &str, salt: &str, expected_hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(expected_hash).map_err(|e| anyhow!("Invalid hash format: {}", e))?;

        if parsed.salt.map(|s| s.as_str()) != Some(salt) {
            return Ok(false);
        }

        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Non-blocking [`derive`](Self::derive)
    pub async fn derive_async(&self, password: String, salt: String) -> Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.derive(&password, &salt))
            .await
            .map_err(|e| anyhow!("Task join error: {}", e))?
    }

    /// Non-blocking [`verify`](Self::verify)
    pub async fn verify_async(
        &self,
        password: String,
        salt: String,
        expected_hash: String,
    ) -> Result<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &salt, &expected_hash))
            .await
            .map_err(|e| anyhow!("Task join error: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_derive_and_verify() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        let hash = hasher.derive("pw1", &salt).unwrap();

        assert!(hasher.verify("pw1", &salt, &hash).unwrap());
        assert!(!hasher.verify("wrong", &salt, &hash).unwrap());
    }

    #[test]
    fn test_hash_embeds_parameters_and_salt() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        let hash = hasher.derive("pw1", &salt).unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(hash.contains(&salt));
        assert!(!hash.contains("pw1"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let hasher = test_hasher();
        let salt1 = CredentialHasher::generate_salt().unwrap();
        let salt2 = CredentialHasher::generate_salt().unwrap();
        assert_ne!(salt1, salt2);

        let hash1 = hasher.derive("password", &salt1).unwrap();
        let hash2 = hasher.derive("password", &salt2).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_derive_is_deterministic_for_fixed_salt() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        assert_eq!(
            hasher.derive("password", &salt).unwrap(),
            hasher.derive("password", &salt).unwrap()
        );
    }

    #[test]
    fn test_verify_rejects_mismatched_salt() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        let other = CredentialHasher::generate_salt().unwrap();
        let hash = hasher.derive("pw1", &salt).unwrap();

        assert!(!hasher.verify("pw1", &other, &hash).unwrap());
    }

    #[test]
    fn test_verify_uses_parameters_from_hash() {
        let salt = CredentialHasher::generate_salt().unwrap();
        let hash = test_hasher().derive("pw1", &salt).unwrap();

        let stronger = CredentialHasher::new(&HasherConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify("pw1", &salt, &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        assert!(hasher.verify("pw1", &salt, "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_async_derive_and_verify() {
        let hasher = test_hasher();
        let salt = CredentialHasher::generate_salt().unwrap();
        let hash = hasher
            .derive_async("async_pw".to_string(), salt.clone())
            .await
            .unwrap();

        assert!(hasher
            .verify_async("async_pw".to_string(), salt.clone(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher
            .verify_async("wrong".to_string(), salt, hash)
            .await
            .unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Property: a hash verifies for its own password and no other
        #[test]
        fn prop_verify_accepts_only_original_password(
            password in "[ -~]{1,32}",
            other in "[ -~]{1,32}",
        ) {
            prop_assume!(password != other);
            let hasher = test_hasher();
            let salt = CredentialHasher::generate_salt().unwrap();
            let hash = hasher.derive(&password, &salt).unwrap();

            prop_assert!(hasher.verify(&password, &salt, &hash).unwrap());
            prop_assert!(!hasher.verify(&other, &salt, &hash).unwrap());
        }
    }
}
