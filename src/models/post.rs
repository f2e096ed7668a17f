//! Post model
//!
//! This module provides:
//! - `Post` entity representing a content record
//! - `PostCategory` enum for the closed category set
//! - Input types for creating and updating posts
//! - Query/pagination types for list operations
//!
//! Update inputs distinguish "field absent" from "field set to null" with a
//! double `Option`: the outer layer is presence in the request, the inner
//! layer is the value itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// URL-friendly unique slug (kebab-case)
    pub slug: Option<String>,
    /// Post body
    pub content: Option<String>,
    /// Image reference (absolute URL or uploads path)
    pub image: Option<String>,
    /// Post category
    pub category: PostCategory,
    /// Whether the post is publicly visible
    pub published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Optimistic version counter, incremented on every update
    pub version: i64,
}

/// Post category
///
/// Closed enumeration: unknown categories are rejected at the serde
/// boundary rather than stored as free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostCategory {
    /// General articles
    Articles,
    /// Self-growth content
    SelfGrowth,
    /// Psychology content
    Psychology,
}

impl PostCategory {
    /// Convert category to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::Articles => "articles",
            PostCategory::SelfGrowth => "self-growth",
            PostCategory::Psychology => "psychology",
        }
    }

    /// Parse category from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "articles" => Some(PostCategory::Articles),
            "self-growth" => Some(PostCategory::SelfGrowth),
            "psychology" => Some(PostCategory::Psychology),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostInput {
    /// Post title (slug is derived from this when no explicit slug is given)
    pub title: String,
    /// Explicit slug request (optional; must already be kebab-case)
    #[serde(default)]
    pub slug: Option<String>,
    /// Post body (optional; blank normalizes to null)
    #[serde(default)]
    pub content: Option<String>,
    /// Image reference (optional; validated against the allowed shapes)
    #[serde(default)]
    pub image: Option<String>,
    /// Post category
    pub category: PostCategory,
    /// Published flag (defaults to true)
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl Default for PostCategory {
    fn default() -> Self {
        PostCategory::Articles
    }
}

/// Input for updating an existing post (partial update)
///
/// Fields wrapped in a double `Option` accept an explicit null: `None` means
/// the field was absent from the request, `Some(None)` means it was set to
/// null and should be cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New slug request (null re-derives from the title)
    #[serde(default, deserialize_with = "double_option")]
    pub slug: Option<Option<String>>,
    /// New content (null or blank clears it)
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    /// New image reference (null clears it and removes the old file)
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    /// New category
    #[serde(default)]
    pub category: Option<PostCategory>,
    /// New published flag
    #[serde(default)]
    pub published: Option<bool>,
}

/// Deserialize a field that may be absent, null, or a value.
///
/// serde collapses both "absent" and "null" to `None` by default; wrapping
/// the present case in an extra `Some` preserves the distinction.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

impl UpdatePostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.slug.is_some()
            || self.content.is_some()
            || self.image.is_some()
            || self.category.is_some()
            || self.published.is_some()
    }
}

/// Filter parameters for list queries
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Case-insensitive substring filter over title OR content
    pub q: Option<String>,
    /// Category filter
    pub category: Option<PostCategory>,
}

impl PostQuery {
    /// Normalize the substring filter: collapse whitespace, drop if blank
    pub fn normalized(mut self) -> Self {
        self.q = self.q.and_then(|q| {
            let q = q.split_whitespace().collect::<Vec<_>>().join(" ");
            if q.is_empty() {
                None
            } else {
                Some(q)
            }
        });
        self
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping to sane bounds
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    ///
    /// Computed in i64 so that page numbers near u32::MAX cannot overflow.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1).max(0) * i64::from(self.limit)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 {
            return 0;
        }
        ((self.total as u32) + self.limit - 1) / self.limit
    }
}
