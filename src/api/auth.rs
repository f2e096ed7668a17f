//! Authentication API endpoints
//!
//! Handles HTTP requests for account authentication:
//! - POST /api/v1/auth/register - Account registration
//! - POST /api/v1/auth/login - Account login
//! - POST /api/v1/auth/logout - Clear the session cookie
//! - GET /api/v1/auth/me - Get current account
//!
//! Successful register/login responses carry the token twice: in the JSON
//! body for API clients and in an HttpOnly cookie for the browser frontend.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{
    clear_session_cookie, session_cookie, ApiError, AppState, CurrentAccount,
};
use crate::api::responses::AccountResponse;

/// Request body for registration and login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub account: AccountResponse,
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(get_current_account))
}

/// POST /api/v1/auth/register - Account registration
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth_service
        .register(&body.email, &body.password)
        .await?;

    let cookie = session_cookie(&outcome.token, state.auth_service.token_expiry_seconds());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            account: outcome.account.into(),
            token: outcome.token,
        }),
    ))
}

/// POST /api/v1/auth/login - Account login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .auth_service
        .authenticate(&body.email, &body.password)
        .await?;

    let cookie = session_cookie(&outcome.token, state.auth_service.token_expiry_seconds());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            account: outcome.account.into(),
            token: outcome.token,
        }),
    ))
}

/// POST /api/v1/auth/logout - Clear the session cookie
///
/// Tokens are stateless, so logout only instructs the browser to drop the
/// cookie. API clients simply discard the token.
async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static(clear_session_cookie()),
    );

    (StatusCode::NO_CONTENT, headers)
}

/// GET /api/v1/auth/me - Get current account
async fn get_current_account(
    CurrentAccount(account): CurrentAccount,
) -> Json<AccountResponse> {
    Json(account.into())
}
