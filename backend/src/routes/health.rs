//! Health check endpoints
//!
//! - /health - Basic health check
//! - /health/ready - Readiness probe (checks both stores)
//! - /health/live - Liveness probe (always returns OK if server is running)

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<HealthChecks>,
}

/// Individual health checks
#[derive(Serialize)]
pub struct HealthChecks {
    pub credentials: CheckStatus,
    pub sessions: CheckStatus,
}

/// Status of an individual check
#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
}

impl CheckStatus {
    fn from_result<E: std::fmt::Display>(store: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                status: "healthy".to_string(),
            },
            Err(e) => {
                tracing::warn!(store, error = %e, "Readiness check failed");
                Self {
                    status: "unhealthy".to_string(),
                }
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

fn response(status: &str, checks: Option<HealthChecks>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    }
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(response("healthy", None))
}

/// Readiness probe
///
/// Returns 503 if either store is unreachable. Failure detail is logged, not
/// returned.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let auth = state.auth();
    let checks = HealthChecks {
        credentials: CheckStatus::from_result("credentials", auth.credentials().health_check().await),
        sessions: CheckStatus::from_result("sessions", auth.sessions().health_check().await),
    };

    if checks.credentials.is_healthy() && checks.sessions.is_healthy() {
        Ok(Json(response("ready", Some(checks))))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response("not_ready", Some(checks))),
        ))
    }
}

/// Liveness probe
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(response("alive", None))
}

/// Prometheus scrape endpoint; 404 when no recorder is installed
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_healthy() {
        let response = health_check().await;
        assert_eq!(response.status, "healthy");
        assert!(!response.version.is_empty());
    }

    #[tokio::test]
    async fn test_liveness_check_returns_alive() {
        let response = liveness_check().await;
        assert_eq!(response.status, "alive");
    }

    #[test]
    fn test_failed_check_is_unhealthy() {
        let status = CheckStatus::from_result("sessions", Err("connection refused"));
        assert!(!status.is_healthy());
    }
}
