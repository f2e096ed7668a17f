//! Post service
//!
//! Implements business logic for post management:
//! - Create, read, update, delete posts
//! - Slug derivation and uniqueness
//! - Image reference lifecycle
//! - Validation
//!
//! # Slug uniqueness
//!
//! Slugs are checked before use, but the database's partial unique index is
//! the real arbiter. When an insert or update loses the race and the store
//! reports a unique violation, the operation re-derives a fresh candidate
//! and retries exactly once; a second violation surfaces as a conflict.
//! Explicitly requested slugs are never suffixed, a collision there is
//! always a conflict.

use crate::config::UploadConfig;
use crate::db::repositories::{PostRepository, RepoError};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostQuery, UpdatePostInput,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Maximum accepted title length
const MAX_TITLE_LEN: usize = 200;

/// Maximum accepted image reference length
const MAX_IMAGE_LEN: usize = 512;

/// Maximum length of a derived slug root before suffixing
const MAX_SLUG_LEN: usize = 200;

/// Suffix attempts before falling back to a random tail
const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Placeholder slug root when the title yields nothing usable
const SLUG_PLACEHOLDER: &str = "post";

static SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug regex must compile")
});

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already taken by another post
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    /// Image reference does not match an accepted shape
    #[error("Invalid image path format: {0}")]
    InvalidImage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<RepoError> for PostServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => PostServiceError::NotFound("post".to_string()),
            other => PostServiceError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Derive a URL slug from a title.
///
/// Lowercases, maps every run of non-alphanumeric ASCII to a single hyphen,
/// drops non-ASCII characters, and trims hyphens from both ends. Titles
/// that yield nothing usable fall back to a placeholder root.
pub fn derive_slug(title: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = true; // suppress leading hyphen

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if c.is_ascii() && !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
        // non-ASCII characters are dropped entirely
        if result.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    let result = result.trim_matches('-');
    if result.is_empty() {
        SLUG_PLACEHOLDER.to_string()
    } else {
        result.to_string()
    }
}

/// Check whether a string is a well-formed kebab-case slug
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && SLUG_RE.is_match(slug)
}

/// How a slug candidate was chosen, which decides the conflict behavior
enum SlugSource {
    /// Requested verbatim by the caller
    Explicit,
    /// Derived from the title, eligible for suffixing and retry
    Derived { root: String },
}

/// Post service for managing blog posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    upload: UploadConfig,
}

impl PostService {
    /// Create a new post service
    pub fn new(repo: Arc<dyn PostRepository>, upload: UploadConfig) -> Self {
        Self { repo, upload }
    }

    /// Create a new post
    ///
    /// Derives the slug from the title unless an explicit slug was given.
    pub async fn create_post(&self, input: &CreatePostInput) -> Result<Post, PostServiceError> {
        let title = validate_title(&input.title)?;
        let content = normalize_content(input.content.as_deref());

        if let Some(image) = &input.image {
            self.validate_image_ref(image)?;
        }

        let source = match &input.slug {
            Some(requested) => {
                let requested = requested.trim();
                if !is_valid_slug(requested) {
                    return Err(PostServiceError::ValidationError(format!(
                        "Slug must be kebab-case: {}",
                        requested
                    )));
                }
                if self.repo.exists_by_slug(requested).await? {
                    return Err(PostServiceError::DuplicateSlug(requested.to_string()));
                }
                SlugSource::Explicit
            }
            None => SlugSource::Derived {
                root: derive_slug(&title),
            },
        };

        let slug = match &source {
            SlugSource::Explicit => input.slug.as_deref().map(str::trim).map(String::from),
            SlugSource::Derived { root } => Some(self.unique_slug(root, None).await?),
        };

        let record = CreatePostInput {
            title,
            slug,
            content,
            image: input.image.clone(),
            category: input.category,
            published: input.published,
        };

        let post = match self.repo.create(&record).await {
            Ok(post) => post,
            Err(RepoError::UniqueViolation) => {
                // Lost the race between the existence check and the insert.
                // For a derived slug, pick a fresh candidate and retry once.
                let SlugSource::Derived { root } = &source else {
                    return Err(PostServiceError::DuplicateSlug(
                        record.slug.unwrap_or_default(),
                    ));
                };
                let retry = CreatePostInput {
                    slug: Some(self.unique_slug(root, None).await?),
                    ..record
                };
                match self.repo.create(&retry).await {
                    Ok(post) => post,
                    Err(RepoError::UniqueViolation) => {
                        return Err(PostServiceError::DuplicateSlug(
                            retry.slug.unwrap_or_default(),
                        ))
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(post_id = post.id, slug = ?post.slug, "Post created");
        Ok(post)
    }

    /// Get a post by ID regardless of publication state
    pub async fn get_post(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("id {}", id)))
    }

    /// Get a published post by slug
    ///
    /// Drafts are invisible here; a draft's slug behaves like a missing one.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post, PostServiceError> {
        match self.repo.get_by_slug(slug).await? {
            Some(post) if post.published => Ok(post),
            _ => Err(PostServiceError::NotFound(format!("slug {}", slug))),
        }
    }

    /// Get a published post by ID, with the same draft-hiding contract as
    /// the slug lookup
    pub async fn get_published_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        match self.repo.get_by_id(id).await? {
            Some(post) if post.published => Ok(post),
            _ => Err(PostServiceError::NotFound(format!("id {}", id))),
        }
    }

    /// Apply a partial update to a post
    ///
    /// Absent fields keep their stored values. Explicit nulls clear the
    /// field: a null slug re-derives from the title, a null image clears
    /// the reference and removes the managed file.
    pub async fn update_post(
        &self,
        id: i64,
        input: &UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let existing = self.get_post(id).await?;

        if !input.has_changes() {
            return Ok(existing);
        }

        let title = match &input.title {
            Some(title) => validate_title(title)?,
            None => existing.title.clone(),
        };

        let content = match &input.content {
            Some(value) => normalize_content(value.as_deref()),
            None => existing.content.clone(),
        };

        let image = match &input.image {
            Some(Some(value)) => {
                self.validate_image_ref(value)?;
                Some(value.clone())
            }
            Some(None) => None,
            None => existing.image.clone(),
        };

        let source = match &input.slug {
            Some(Some(requested)) => {
                let requested = requested.trim();
                if !is_valid_slug(requested) {
                    return Err(PostServiceError::ValidationError(format!(
                        "Slug must be kebab-case: {}",
                        requested
                    )));
                }
                if self.repo.exists_by_slug_excluding(requested, id).await? {
                    return Err(PostServiceError::DuplicateSlug(requested.to_string()));
                }
                SlugSource::Explicit
            }
            Some(None) => SlugSource::Derived {
                root: derive_slug(&title),
            },
            None => SlugSource::Explicit, // keeping the stored slug never conflicts
        };

        let slug = match (&input.slug, &source) {
            (Some(Some(requested)), _) => Some(requested.trim().to_string()),
            (Some(None), SlugSource::Derived { root }) => {
                Some(self.unique_slug(root, Some(id)).await?)
            }
            _ => existing.slug.clone(),
        };

        let candidate = Post {
            title,
            slug,
            content,
            image,
            category: input.category.unwrap_or(existing.category),
            published: input.published.unwrap_or(existing.published),
            ..existing.clone()
        };

        let updated = match self.repo.update(&candidate).await {
            Ok(post) => post,
            Err(RepoError::UniqueViolation) => {
                let SlugSource::Derived { root } = &source else {
                    return Err(PostServiceError::DuplicateSlug(
                        candidate.slug.unwrap_or_default(),
                    ));
                };
                let retry = Post {
                    slug: Some(self.unique_slug(root, Some(id)).await?),
                    ..candidate
                };
                match self.repo.update(&retry).await {
                    Ok(post) => post,
                    Err(RepoError::UniqueViolation) => {
                        return Err(PostServiceError::DuplicateSlug(
                            retry.slug.unwrap_or_default(),
                        ))
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        // Drop the replaced file only after the update is stored
        if let Some(old_image) = &existing.image {
            if updated.image.as_deref() != Some(old_image.as_str()) {
                self.remove_image_file(old_image);
            }
        }

        tracing::info!(post_id = updated.id, version = updated.version, "Post updated");
        Ok(updated)
    }

    /// Delete a post and clean up its managed image file
    pub async fn delete_post(&self, id: i64) -> Result<(), PostServiceError> {
        let existing = self.get_post(id).await?;

        if !self.repo.delete(id).await? {
            return Err(PostServiceError::NotFound(format!("id {}", id)));
        }

        if let Some(image) = &existing.image {
            self.remove_image_file(image);
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }

    /// List published posts, newest first
    pub async fn list_published(
        &self,
        query: PostQuery,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = query.normalized();
        let items = self
            .repo
            .list_published(&query, params.offset(), params.limit())
            .await?;
        let total = self.repo.count_published(&query).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// List all posts for the admin view, most recently updated first
    pub async fn list_all(
        &self,
        query: PostQuery,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = query.normalized();
        let items = self
            .repo
            .list_all(&query, params.offset(), params.limit())
            .await?;
        let total = self.repo.count_all(&query).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Find a free slug starting from a derived root.
    ///
    /// Tries the root itself, then `root-2`, `root-3`, and so on. After too
    /// many occupied candidates a random tail breaks the sequence.
    async fn unique_slug(
        &self,
        root: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, PostServiceError> {
        let mut candidate = root.to_string();
        let mut n = 2;

        while self.slug_taken(&candidate, exclude_id).await? {
            if n > MAX_SLUG_ATTEMPTS {
                let tail = uuid::Uuid::new_v4().simple().to_string();
                candidate = format!("{}-{}", root, &tail[..8]);
                break;
            }
            candidate = format!("{}-{}", root, n);
            n += 1;
        }

        Ok(candidate)
    }

    async fn slug_taken(
        &self,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, PostServiceError> {
        let taken = match exclude_id {
            Some(id) => self.repo.exists_by_slug_excluding(slug, id).await?,
            None => self.repo.exists_by_slug(slug).await?,
        };
        Ok(taken)
    }

    /// Check that an image reference has one of the accepted shapes: an
    /// absolute http(s) URL or a path under the managed upload prefix.
    /// A bad shape is a conflict with the image contract, not a field
    /// validation failure.
    fn validate_image_ref(&self, image: &str) -> Result<(), PostServiceError> {
        if image.is_empty() || image.len() > MAX_IMAGE_LEN {
            return Err(PostServiceError::InvalidImage(truncate_ref(image)));
        }

        let prefix = format!("{}/", self.upload.public_prefix);
        if image.starts_with("http://")
            || image.starts_with("https://")
            || image.starts_with(&prefix)
        {
            Ok(())
        } else {
            Err(PostServiceError::InvalidImage(truncate_ref(image)))
        }
    }

    /// Best-effort removal of a managed upload file.
    ///
    /// External URLs and malformed references are ignored. Failures are
    /// logged and swallowed: a missing file must never fail the write that
    /// triggered the cleanup.
    fn remove_image_file(&self, image: &str) {
        let prefix = format!("{}/", self.upload.public_prefix);
        let Some(rest) = image.strip_prefix(&prefix) else {
            return;
        };

        // Refuse anything that is not a bare file name
        if rest.is_empty() || rest.contains('/') || rest.contains("..") {
            tracing::warn!(image, "Refusing to remove suspicious image reference");
            return;
        }

        let path = self.upload.path.join(rest);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(?path, "Removed replaced image file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(?path, error = %e, "Failed to remove image file"),
        }
    }
}

/// Keep rejected image references readable in error messages
fn truncate_ref(image: &str) -> String {
    let mut shown: String = image.chars().take(80).collect();
    if shown.len() < image.len() {
        shown.push_str("...");
    }
    shown
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn normalize_content(content: Option<&str>) -> Option<String> {
    content.and_then(|c| {
        if c.trim().is_empty() {
            None
        } else {
            Some(c.to_string())
        }
    })
}
