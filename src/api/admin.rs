//! Admin post API endpoints
//!
//! Handles HTTP requests for post management (admin role required):
//! - GET /api/v1/admin/posts - List all posts including drafts
//! - POST /api/v1/admin/posts - Create a post
//! - GET /api/v1/admin/posts/{id} - Get any post by ID
//! - PATCH /api/v1/admin/posts/{id} - Partially update a post
//! - DELETE /api/v1/admin/posts/{id} - Delete a post
//!
//! The admin list is ordered by last update so fresh edits surface first.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::posts::ListPostsQuery;
use crate::api::responses::{PostListResponse, PostResponse};
use crate::models::{CreatePostInput, UpdatePostInput};

/// Build the admin posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_posts_handler).post(create_post_handler))
        .route(
            "/{id}",
            get(get_post_by_id_handler)
                .patch(update_post_handler)
                .delete(delete_post_handler),
        )
}

/// GET /api/v1/admin/posts - List all posts including drafts
pub async fn list_all_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let (filter, params) = query.into_parts()?;

    let page = state.post_service.list_all(filter, &params).await?;
    Ok(Json(page.into()))
}

/// POST /api/v1/admin/posts - Create a post
pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let post = state.post_service.create_post(&body).await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// GET /api/v1/admin/posts/{id} - Get any post by ID
pub async fn get_post_by_id_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_post(id).await?;
    Ok(Json(post.into()))
}

/// PATCH /api/v1/admin/posts/{id} - Partially update a post
///
/// Absent fields are left alone; explicit nulls clear nullable fields.
pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.update_post(id, &body).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/v1/admin/posts/{id} - Delete a post
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
