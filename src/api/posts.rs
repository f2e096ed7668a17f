//! Public post API endpoints
//!
//! Handles read-only HTTP requests for published posts:
//! - GET /api/v1/posts - List published posts with pagination and filters
//! - GET /api/v1/posts/slug/{slug} - Get a published post by slug
//! - GET /api/v1/posts/{id} - Get a published post by ID
//!
//! Drafts never appear here; write operations live under /admin.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PublicPostListResponse, PublicPostResponse};
use crate::models::{ListParams, PostCategory, PostQuery};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Keyword matched against title or content
    pub q: Option<String>,
    /// Category filter
    pub category: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    10
}

impl ListPostsQuery {
    /// Split into the filter and pagination halves, rejecting unknown
    /// category values instead of silently ignoring them.
    pub fn into_parts(self) -> Result<(PostQuery, ListParams), ApiError> {
        let category = match self.category.as_deref() {
            Some(raw) => Some(PostCategory::parse(raw).ok_or_else(|| {
                ApiError::validation_error(format!("Unknown category: {}", raw))
            })?),
            None => None,
        };

        Ok((
            PostQuery {
                q: self.q,
                category,
            },
            ListParams::new(self.page, self.limit),
        ))
    }
}

/// Build the public posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts_handler))
        .route("/slug/{slug}", get(get_post_by_slug_handler))
        .route("/{id}", get(get_post_by_id_handler))
}

/// GET /api/v1/posts - List published posts
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PublicPostListResponse>, ApiError> {
    let (filter, params) = query.into_parts()?;

    let page = state.post_service.list_published(filter, &params).await?;
    Ok(Json(page.into()))
}

/// GET /api/v1/posts/slug/{slug} - Get a published post by slug
pub async fn get_post_by_slug_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPostResponse>, ApiError> {
    let post = state.post_service.get_published_by_slug(&slug).await?;
    Ok(Json(post.into()))
}

/// GET /api/v1/posts/{id} - Get a published post by ID
pub async fn get_post_by_id_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicPostResponse>, ApiError> {
    let post = state.post_service.get_published_by_id(id).await?;
    Ok(Json(post.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_clamping() {
        let query = ListPostsQuery {
            page: 0,
            limit: 9999,
            q: None,
            category: None,
        };
        let (_, params) = query.into_parts().expect("Should parse");
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let query = ListPostsQuery {
            page: 1,
            limit: 10,
            q: None,
            category: Some("cooking".to_string()),
        };
        assert!(query.into_parts().is_err());
    }

    #[test]
    fn test_known_category_parsed() {
        let query = ListPostsQuery {
            page: 1,
            limit: 10,
            q: Some("focus".to_string()),
            category: Some("self-growth".to_string()),
        };
        let (filter, _) = query.into_parts().expect("Should parse");
        assert_eq!(filter.category, Some(PostCategory::SelfGrowth));
        assert_eq!(filter.q.as_deref(), Some("focus"));
    }
}
