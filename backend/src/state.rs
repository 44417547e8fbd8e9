//! Application state management
//!
//! Shared state handed to every request handler via Axum's state extraction.
//! Built once at startup and read-only afterwards; every field is cheap to
//! clone.

use crate::auth::{CredentialHasher, SigningSecret, TokenService};
use crate::config::AppConfig;
use crate::repositories::{CredentialStore, SessionStore};
use crate::services::AuthService;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Auth orchestrator, owning the stores and the token service
    pub auth: AuthService,
    /// Prometheus renderer, when a recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the auth service from configuration
    ///
    /// `secret` signs every token this process issues; pass a freshly
    /// generated one at startup.
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        secret: &SigningSecret,
    ) -> Result<Self> {
        let hasher = CredentialHasher::new(&config.hasher)?;
        let tokens = TokenService::new(secret, config.session.token_ttl_secs);
        let auth = AuthService::new(credentials, sessions, hasher, tokens);

        Ok(Self {
            config: Arc::new(config),
            auth,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the auth service
    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}
