//! Authentication routes
//!
//! Register, login, refresh, logout and identity lookup. Password hashing
//! runs on the blocking thread pool inside the auth service.

use crate::auth::{AuthUser, BearerToken};
use crate::error::ApiResult;
use crate::services::IssuedToken;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use session_auth_shared::{IdentityResponse, LoginRequest, RegisterRequest, TokenResponse};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

fn token_response(issued: IssuedToken) -> Json<TokenResponse> {
    Json(TokenResponse::bearer(issued.token, issued.expires_in))
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let issued = state.auth().register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, token_response(issued)))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let issued = state.auth().login(&req.email, &req.password).await?;
    Ok(token_response(issued))
}

/// POST /api/v1/auth/refresh
///
/// The current token goes in the Authorization header; the response carries
/// its replacement.
async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<TokenResponse>> {
    let issued = state.auth().refresh(&token).await?;
    Ok(token_response(issued))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<StatusCode> {
    state.auth().logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn me(auth_user: AuthUser) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        user_id: auth_user.user_id,
    })
}
