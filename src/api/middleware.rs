//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - Authorization (admin role checking)
//!
//! Tokens are accepted from the `Authorization: Bearer` header first, then
//! from the `access_token` cookie, so both API clients and the browser
//! frontend work against the same endpoints.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::models::Account;
use crate::services::auth::AuthServiceError;
use crate::services::post::PostServiceError;
use crate::services::{AuthService, PostService};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "access_token";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
    pub upload_config: Arc<UploadConfig>,
}

/// Authenticated account extracted from request extensions
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl<S> axum::extract::FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            AuthServiceError::InvalidCredentials | AuthServiceError::AccountNotFound => {
                ApiError::unauthorized("Invalid credentials")
            }
            AuthServiceError::EmailTaken => ApiError::conflict("Registration failed"),
            AuthServiceError::RegistrationDisabled => {
                ApiError::forbidden("Registration is disabled")
            }
            AuthServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Auth service failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(err: PostServiceError) -> Self {
        match err {
            PostServiceError::NotFound(what) => {
                ApiError::not_found(format!("Post not found: {}", what))
            }
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Slug already exists: {}", slug))
            }
            PostServiceError::InvalidImage(image) => {
                ApiError::conflict(format!("Invalid image path format: {}", image))
            }
            PostServiceError::InternalError(e) => {
                tracing::error!(error = %e, "Post service failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Extract session token from request
///
/// The Authorization header wins over the cookie when both are present.
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("access_token=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let claims = state
        .auth_service
        .verify_token(&token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let account = state.auth_service.current_account(&claims).await?;

    request.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let account = request
        .extensions()
        .get::<CurrentAccount>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !account.0.role.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// Build the Set-Cookie value for a fresh session token
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Build the Set-Cookie value that clears the session cookie
pub fn clear_session_cookie() -> &'static str {
    "access_token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        let request = request_with_headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(extract_session_token(&request), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let request = request_with_headers(&[("cookie", "theme=dark; access_token=xyz; lang=en")]);
        assert_eq!(extract_session_token(&request), Some("xyz".to_string()));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let request = request_with_headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "access_token=from-cookie"),
        ]);
        assert_eq!(
            extract_session_token(&request),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_no_token_sources() {
        let request = request_with_headers(&[]);
        assert_eq!(extract_session_token(&request), None);

        let basic = request_with_headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_session_token(&basic), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (
                ApiError::internal_error("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_cookie_helpers() {
        let cookie = session_cookie("tok", 864000);
        assert!(cookie.starts_with("access_token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=864000"));

        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    proptest::proptest! {
        #[test]
        fn prop_cookie_extraction_never_panics(cookie in "[ -~]{0,100}") {
            if let Ok(request) = Request::builder()
                .uri("/")
                .header("cookie", cookie)
                .body(Body::empty())
            {
                let _ = extract_session_token(&request);
            }
        }
    }
}
