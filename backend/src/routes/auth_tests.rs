//! Property-based tests for bearer authentication
//!
//! Protected endpoints must answer 401 for every malformed, foreign or
//! revoked token, and must answer identically whatever the cause.

#[cfg(test)]
mod tests {
    use crate::auth::{SigningSecret, TokenService};
    use crate::config::AppConfig;
    use crate::repositories::{InMemoryCredentialStore, InMemorySessionStore};
    use crate::routes::create_router;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use proptest::prelude::*;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Test state over in-memory stores with cheap hashing
    fn create_test_state() -> AppState {
        let mut config = AppConfig::default();
        config.hasher.memory_kib = 1024;
        config.hasher.iterations = 1;
        AppState::new(
            config,
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemorySessionStore::new()),
            &SigningSecret::generate(),
        )
        .unwrap()
    }

    /// Generate random invalid tokens
    fn invalid_token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("".to_string()),
            // Random string (not a JWT)
            "[a-zA-Z0-9]{10,50}",
            // Wrong number of parts
            "[a-zA-Z0-9]{10}\\.[a-zA-Z0-9]{10}",
            // Right shape, bogus content
            "[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}\\.[a-zA-Z0-9_-]{20}",
        ]
    }

    /// Generate random authorization header formats
    fn auth_header_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            invalid_token_strategy().prop_map(Some),
            invalid_token_strategy().prop_map(|t| Some(format!("Basic {}", t))),
            invalid_token_strategy().prop_map(|t| Some(format!("Bearer {}", t))),
        ]
    }

    async fn send(state: AppState, method: &str, uri: &str, auth: Option<String>) -> StatusCode {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(header) = auth {
            builder = builder.header("Authorization", header);
        }
        let response = create_router(state)
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: unauthenticated requests to protected endpoints return 401
        #[test]
        fn prop_unauthenticated_requests_return_401(
            auth_header in auth_header_strategy(),
            endpoint in prop_oneof![
                Just(("GET", "/api/v1/auth/me")),
                Just(("POST", "/api/v1/auth/refresh")),
                Just(("POST", "/api/v1/auth/logout")),
            ],
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (method, uri) = endpoint;
            let status = rt.block_on(send(create_test_state(), method, uri, auth_header));

            prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_missing_auth_header_returns_401() {
        let status = send(create_test_state(), "GET", "/api/v1/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_auth_scheme_returns_401() {
        let status = send(
            create_test_state(),
            "GET",
            "/api/v1/auth/me",
            Some("Basic dXNlcjpwYXNz".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_with_wrong_secret_returns_401() {
        let state = create_test_state();
        let foreign = TokenService::new(&SigningSecret::generate(), 300);
        let token = foreign.issue(uuid::Uuid::new_v4()).unwrap();

        let status = send(
            state,
            "GET",
            "/api/v1/auth/me",
            Some(format!("Bearer {}", token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signed_token_without_session_returns_401() {
        let state = create_test_state();
        let token = state.auth().tokens().issue(uuid::Uuid::new_v4()).unwrap();

        let status = send(
            state,
            "GET",
            "/api/v1/auth/me",
            Some(format!("Bearer {}", token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_with_live_session_passes_auth() {
        let state = create_test_state();
        let user_id = uuid::Uuid::new_v4();
        let token = state.auth().tokens().issue(user_id).unwrap();
        state.auth().sessions().create(user_id, &token).await.unwrap();

        let status = send(
            state,
            "GET",
            "/api/v1/auth/me",
            Some(format!("Bearer {}", token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
