//! Periodic removal of inactive sessions
//!
//! Runs on a fixed `tokio::time::interval`, alongside request handling and
//! sharing the same session store. A failed sweep is logged and skipped;
//! the next tick tries again.

use crate::config::SessionConfig;
use crate::repositories::{SessionStore, StoreError};
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Deletes sessions whose `last_seen` is older than the inactivity threshold
#[derive(Clone)]
pub struct SessionCleaner {
    sessions: Arc<dyn SessionStore>,
    threshold: Duration,
    interval: std::time::Duration,
}

impl SessionCleaner {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        threshold: Duration,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            sessions,
            threshold,
            interval,
        }
    }

    pub fn from_config(sessions: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self::new(
            sessions,
            Duration::seconds(config.inactivity_threshold_secs),
            std::time::Duration::from_secs(config.sweep_interval_secs),
        )
    }

    /// One pass: list stale sessions and delete each.
    ///
    /// Stops at the first store error. Returns how many sessions were removed.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let expired = self.sessions.list_expired(self.threshold).await?;

        for session in &expired {
            self.sessions.delete(&session.session_token).await?;
            tracing::debug!(user_id = %session.user_id, "Expired session removed");
        }

        Ok(expired.len())
    }

    /// Sweep on every tick until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            threshold_secs = self.threshold.num_seconds(),
            interval_secs = self.interval.as_secs(),
            "Session cleaner started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Session cleaner stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(0) => tracing::debug!("Session cleaner: nothing to remove"),
                        Ok(deleted) => {
                            metrics::counter!("session_sweep_deleted_total").increment(deleted as u64);
                            tracing::info!(deleted, "Session cleaner: removed inactive sessions");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Session cleaner: sweep failed, retrying next tick");
                        }
                    }
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) onto the runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
