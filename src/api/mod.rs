//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Minerva blog backend:
//! - Auth API endpoints (register, login, logout, me)
//! - Public post API endpoints (published reads)
//! - Admin post API endpoints (full CRUD)
//! - Upload API endpoints (post images)
//!
//! Everything is served under /api/v1; uploaded images are served as static
//! files under the configured public prefix.

pub mod admin;
pub mod auth;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::Config;

pub use middleware::{ApiError, AppState, CurrentAccount};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin/posts", admin::router())
        .nest("/admin/uploads", upload::router(&state.upload_config))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/posts", posts::router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    // Cookie auth needs an exact origin and credentials
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .server
                .cors_origin
                .parse::<HeaderValue>()
                .expect("cors_origin must be a valid header value"),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(
            &config.upload.public_prefix,
            ServeDir::new(&config.upload.path),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
