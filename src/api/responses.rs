//! Shared API response types
//!
//! Conversions from model types into their JSON wire shapes. Timestamps are
//! rendered as RFC 3339 strings; the password hash never appears here.

use serde::{Deserialize, Serialize};

use crate::models::{Account, PagedResult, Post};

/// Response for account info
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            role: account.role.to_string(),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Response for a single post
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            image: post.image,
            category: post.category.to_string(),
            published: post.published,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            version: post.version,
        }
    }
}

/// Reduced projection for public reads
///
/// Public callers only ever see published posts, so the published flag,
/// update timestamp and version counter are omitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicPostResponse {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub created_at: String,
}

impl From<Post> for PublicPostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            image: post.image,
            category: post.category.to_string(),
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

/// Pagination envelope for list responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Response for post lists
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: Pagination,
}

impl From<PagedResult<Post>> for PostListResponse {
    fn from(result: PagedResult<Post>) -> Self {
        let total_pages = result.total_pages();
        Self {
            pagination: Pagination {
                total: result.total,
                page: result.page,
                limit: result.limit,
                total_pages,
            },
            posts: result.items.into_iter().map(PostResponse::from).collect(),
        }
    }
}

/// Response for public post lists
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicPostListResponse {
    pub posts: Vec<PublicPostResponse>,
    pub pagination: Pagination,
}

impl From<PagedResult<Post>> for PublicPostListResponse {
    fn from(result: PagedResult<Post>) -> Self {
        let total_pages = result.total_pages();
        Self {
            pagination: Pagination {
                total: result.total,
                page: result.page,
                limit: result.limit,
                total_pages,
            },
            posts: result
                .items
                .into_iter()
                .map(PublicPostResponse::from)
                .collect(),
        }
    }
}
