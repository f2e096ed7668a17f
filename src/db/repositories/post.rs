//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite
//!
//! Slug uniqueness is ultimately enforced here by the partial unique index:
//! `create` and `update` surface a constraint failure as
//! `RepoError::UniqueViolation` so the service layer can run its retry.

use crate::db::repositories::{RepoError, RepoResult};
use crate::models::{CreatePostInput, Post, PostCategory, PostQuery};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    ///
    /// The slug in `input` must already be final (derived and de-duplicated
    /// by the caller). Returns `RepoError::UniqueViolation` if it lost a race
    /// to another writer.
    async fn create(&self, input: &CreatePostInput) -> RepoResult<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> RepoResult<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Post>>;

    /// Persist new field values for an existing post
    ///
    /// Writes every content field from `post`, stamps `updated_at` and
    /// increments the version counter. Returns the stored row.
    async fn update(&self, post: &Post) -> RepoResult<Post>;

    /// Delete a post, returning whether a row was removed
    async fn delete(&self, id: i64) -> RepoResult<bool>;

    /// List published posts matching the filter, newest first
    async fn list_published(&self, query: &PostQuery, offset: i64, limit: i64) -> RepoResult<Vec<Post>>;

    /// Count published posts matching the filter
    async fn count_published(&self, query: &PostQuery) -> RepoResult<i64>;

    /// List all posts matching the filter, most recently updated first
    async fn list_all(&self, query: &PostQuery, offset: i64, limit: i64) -> RepoResult<Vec<Post>>;

    /// Count all posts matching the filter
    async fn count_all(&self, query: &PostQuery) -> RepoResult<i64>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> RepoResult<bool>;

    /// Check if a slug exists for a different post (for updates)
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> RepoResult<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str =
    "id, title, slug, content, image, category, published, created_at, updated_at, version";

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> RepoResult<Post> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, slug, content, image, category, published, created_at, updated_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(&input.image)
        .bind(input.category.as_str())
        .bind(input.published)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id: result.last_insert_rowid(),
            title: input.title.clone(),
            slug: input.slug.clone(),
            content: input.content.clone(),
            image: input.image.clone(),
            category: input.category,
            published: input.published,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_post(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_post(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, post: &Post) -> RepoResult<Post> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, slug = ?, content = ?, image = ?, category = ?, published = ?,
                updated_at = ?, version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.category.as_str())
        .bind(post.published)
        .bind(now)
        .bind(post.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        self.get_by_id(post.id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_published(&self, query: &PostQuery, offset: i64, limit: i64) -> RepoResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts", POST_COLUMNS));
        push_filters(&mut qb, query, true);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_post).collect()
    }

    async fn count_published(&self, query: &PostQuery) -> RepoResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        push_filters(&mut qb, query, true);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.get(0))
    }

    async fn list_all(&self, query: &PostQuery, offset: i64, limit: i64) -> RepoResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts", POST_COLUMNS));
        push_filters(&mut qb, query, false);
        qb.push(" ORDER BY updated_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_post).collect()
    }

    async fn count_all(&self, query: &PostQuery) -> RepoResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        push_filters(&mut qb, query, false);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.get(0))
    }

    async fn exists_by_slug(&self, slug: &str) -> RepoResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> RepoResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
            .bind(slug)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

/// Append WHERE conditions for the shared list filter.
///
/// Filters compose with AND: published scope, category, then the keyword
/// matched against title OR content. SQLite LIKE is case-insensitive for
/// ASCII, which matches the public search contract.
fn push_filters(qb: &mut QueryBuilder<Sqlite>, query: &PostQuery, published_only: bool) {
    let mut prefix = " WHERE ";

    if published_only {
        qb.push(prefix).push("published = 1");
        prefix = " AND ";
    }

    if let Some(category) = &query.category {
        qb.push(prefix).push("category = ").push_bind(category.as_str());
        prefix = " AND ";
    }

    if let Some(q) = &query.q {
        let pattern = format!("%{}%", escape_like(q));
        qb.push(prefix)
            .push("(title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR content LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Escape LIKE metacharacters so the keyword matches literally
fn escape_like(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> RepoResult<Post> {
    let category_str: String = row.get("category");
    let category = PostCategory::parse(&category_str)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown category: {}", category_str)))?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        image: row.get("image"),
        category,
        published: row.get("published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup_repo() -> SqlxPostRepository {
        let pool = create_test_pool().await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Migrations failed");
        SqlxPostRepository::new(pool)
    }

    fn input(title: &str, slug: Option<&str>) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            slug: slug.map(String::from),
            content: Some(format!("{} body", title)),
            image: None,
            category: PostCategory::Articles,
            published: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_repo().await;

        let created = repo
            .create(&input("Hello World", Some("hello-world")))
            .await
            .expect("Create failed");
        assert!(created.id > 0);
        assert_eq!(created.version, 1);

        let by_id = repo
            .get_by_id(created.id)
            .await
            .expect("Get failed")
            .expect("Post should exist");
        assert_eq!(by_id.title, "Hello World");

        let by_slug = repo
            .get_by_slug("hello-world")
            .await
            .expect("Get failed")
            .expect("Post should exist");
        assert_eq!(by_slug.id, created.id);

        assert!(repo
            .get_by_slug("missing")
            .await
            .expect("Get failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_unique_violation() {
        let repo = setup_repo().await;

        repo.create(&input("First", Some("same-slug")))
            .await
            .expect("First create failed");

        let err = repo
            .create(&input("Second", Some("same-slug")))
            .await
            .expect_err("Duplicate slug should fail");
        assert!(err.is_unique_violation());

        // Null slugs never collide
        repo.create(&input("Third", None)).await.expect("Create failed");
        repo.create(&input("Fourth", None)).await.expect("Create failed");
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = setup_repo().await;

        let mut post = repo
            .create(&input("Original", Some("original")))
            .await
            .expect("Create failed");

        post.title = "Renamed".to_string();
        post.content = None;
        let updated = repo.update(&post).await.expect("Update failed");
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.content, None);
        assert_eq!(updated.version, 2);

        let again = repo.update(&updated).await.expect("Update failed");
        assert_eq!(again.version, 3);
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let repo = setup_repo().await;

        let ghost = Post {
            id: 999,
            title: "Ghost".to_string(),
            slug: None,
            content: None,
            image: None,
            category: PostCategory::Articles,
            published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        };

        let err = repo.update(&ghost).await.expect_err("Should not find post");
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup_repo().await;

        let post = repo
            .create(&input("Doomed", Some("doomed")))
            .await
            .expect("Create failed");

        assert!(repo.delete(post.id).await.expect("Delete failed"));
        assert!(!repo.delete(post.id).await.expect("Delete failed"));
        assert!(repo
            .get_by_id(post.id)
            .await
            .expect("Get failed")
            .is_none());
    }

    #[tokio::test]
    async fn test_list_published_applies_filters() {
        let repo = setup_repo().await;

        repo.create(&CreatePostInput {
            published: false,
            ..input("Draft Focus", Some("draft-focus"))
        })
        .await
        .expect("Create failed");
        repo.create(&input("Focus Published", Some("focus-published")))
            .await
            .expect("Create failed");
        repo.create(&CreatePostInput {
            category: PostCategory::Psychology,
            ..input("Mind Matters", Some("mind-matters"))
        })
        .await
        .expect("Create failed");

        // Published scope hides the draft
        let all_published = repo
            .list_published(&PostQuery::default(), 0, 10)
            .await
            .expect("List failed");
        assert_eq!(all_published.len(), 2);
        assert_eq!(
            repo.count_published(&PostQuery::default())
                .await
                .expect("Count failed"),
            2
        );

        // Keyword matches title OR content, case-insensitively
        let focus = PostQuery {
            q: Some("FOCUS".to_string()),
            category: None,
        };
        let matches = repo.list_published(&focus, 0, 10).await.expect("List failed");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slug.as_deref(), Some("focus-published"));

        // Category filter composes with the published scope
        let psych = PostQuery {
            q: None,
            category: Some(PostCategory::Psychology),
        };
        let matches = repo.list_published(&psych, 0, 10).await.expect("List failed");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].title, "Mind Matters");
    }

    #[tokio::test]
    async fn test_keyword_metacharacters_match_literally() {
        let repo = setup_repo().await;

        repo.create(&input("100% Pure Focus", Some("pure-focus")))
            .await
            .expect("Create failed");
        repo.create(&input("1000 Small Steps", Some("small-steps")))
            .await
            .expect("Create failed");
        repo.create(&input("snake_case naming", Some("snake-case")))
            .await
            .expect("Create failed");

        // % in the keyword is a literal percent sign, not a wildcard
        let percent = PostQuery {
            q: Some("100%".to_string()),
            category: None,
        };
        let matches = repo.list_published(&percent, 0, 10).await.expect("List failed");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slug.as_deref(), Some("pure-focus"));

        // _ is a literal underscore, not a single-character wildcard
        let underscore = PostQuery {
            q: Some("snake_case".to_string()),
            category: None,
        };
        let matches = repo
            .list_published(&underscore, 0, 10)
            .await
            .expect("List failed");
        assert_eq!(matches.len(), 1);

        let wildcard_abuse = PostQuery {
            q: Some("100_".to_string()),
            category: None,
        };
        let matches = repo
            .list_published(&wildcard_abuse, 0, 10)
            .await
            .expect("List failed");
        assert!(matches.is_empty(), "Underscore must not match '1000'");
    }

    #[tokio::test]
    async fn test_list_all_includes_drafts_ordered_by_updated_at() {
        let repo = setup_repo().await;

        let first = repo
            .create(&input("First", Some("first")))
            .await
            .expect("Create failed");
        repo.create(&CreatePostInput {
            published: false,
            ..input("Second Draft", Some("second-draft"))
        })
        .await
        .expect("Create failed");

        // Touching the older post moves it to the front of the admin list
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.update(&first).await.expect("Update failed");

        let posts = repo
            .list_all(&PostQuery::default(), 0, 10)
            .await
            .expect("List failed");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, first.id);
        assert_eq!(
            repo.count_all(&PostQuery::default())
                .await
                .expect("Count failed"),
            2
        );
    }

    #[tokio::test]
    async fn test_pagination_offsets() {
        let repo = setup_repo().await;

        for i in 0..5 {
            repo.create(&input(&format!("Post {}", i), Some(&format!("post-{}", i))))
                .await
                .expect("Create failed");
        }

        let page = repo
            .list_all(&PostQuery::default(), 2, 2)
            .await
            .expect("List failed");
        assert_eq!(page.len(), 2);

        let tail = repo
            .list_all(&PostQuery::default(), 4, 2)
            .await
            .expect("List failed");
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn test_exists_by_slug_excluding() {
        let repo = setup_repo().await;

        let post = repo
            .create(&input("Mine", Some("mine")))
            .await
            .expect("Create failed");
        repo.create(&input("Other", Some("other")))
            .await
            .expect("Create failed");

        assert!(repo.exists_by_slug("mine").await.expect("Check failed"));
        assert!(!repo.exists_by_slug("nope").await.expect("Check failed"));

        // A post keeping its own slug is not a conflict
        assert!(!repo
            .exists_by_slug_excluding("mine", post.id)
            .await
            .expect("Check failed"));
        assert!(repo
            .exists_by_slug_excluding("other", post.id)
            .await
            .expect("Check failed"));
    }
}
