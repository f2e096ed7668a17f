//! Database migrations
//!
//! Code-based migrations embedded as SQL strings for single-binary
//! deployment. Applied migrations are tracked in a `_migrations` table so
//! startup is idempotent.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements (semicolon-separated)
    pub up: &'static str,
}

/// All migrations for the Minerva blog backend.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: Create accounts table
    Migration {
        version: 1,
        name: "create_accounts",
        up: r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email);
        "#,
    },
    // Migration 2: Create posts table
    // The partial unique index on slug is the arbiter for slug uniqueness:
    // concurrent writers race through the in-process existence check, and
    // this constraint is what actually rejects the loser.
    Migration {
        version: 2,
        name: "create_posts",
        up: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(220),
                content TEXT,
                image VARCHAR(512),
                category VARCHAR(20) NOT NULL,
                published BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                version INTEGER NOT NULL DEFAULT 1
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_posts_slug ON posts(slug) WHERE slug IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category);
            CREATE INDEX IF NOT EXISTS idx_posts_published_created_at ON posts(published, created_at);
            CREATE INDEX IF NOT EXISTS idx_posts_updated_at ON posts(updated_at);
        "#,
    },
];

/// Run all pending migrations
///
/// Creates the tracking table if needed, then applies any migration whose
/// version is not yet recorded, in order.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_versions(pool).await?;

    let mut count = 0;
    for migration in MIGRATIONS {
        if !applied.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;
    Ok(())
}

/// Get versions of already applied migrations
async fn get_applied_versions(pool: &SqlitePool) -> Result<Vec<i32>> {
    let rows: Vec<(i32,)> = sqlx::query_as("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;
    Ok(rows.into_iter().map(|(v,)| v).collect())
}

/// Apply a single migration and record it
async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.len() > 100 {
        format!("{}...", &sql[..100])
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual non-empty statements
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations_fresh_database() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        let count = run_migrations(&pool).await.expect("Migrations failed");
        assert_eq!(count, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("First run failed");
        let count = run_migrations(&pool).await.expect("Second run failed");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_accounts_email_unique() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Migrations failed");

        sqlx::query("INSERT INTO accounts (email, password_hash, role) VALUES (?, ?, ?)")
            .bind("a@x.com")
            .bind("hash")
            .bind("user")
            .execute(&pool)
            .await
            .expect("First insert failed");

        let result = sqlx::query("INSERT INTO accounts (email, password_hash, role) VALUES (?, ?, ?)")
            .bind("a@x.com")
            .bind("other")
            .bind("admin")
            .execute(&pool)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_posts_slug_unique_among_non_null() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        run_migrations(&pool).await.expect("Migrations failed");

        sqlx::query("INSERT INTO posts (title, slug, category) VALUES (?, ?, ?)")
            .bind("First")
            .bind("hello")
            .bind("articles")
            .execute(&pool)
            .await
            .expect("First insert failed");

        // Duplicate non-null slug is rejected
        let dup = sqlx::query("INSERT INTO posts (title, slug, category) VALUES (?, ?, ?)")
            .bind("Second")
            .bind("hello")
            .bind("articles")
            .execute(&pool)
            .await;
        assert!(dup.is_err());

        // Multiple null slugs are allowed
        for title in ["Third", "Fourth"] {
            sqlx::query("INSERT INTO posts (title, slug, category) VALUES (?, NULL, ?)")
                .bind(title)
                .bind("psychology")
                .execute(&pool)
                .await
                .expect("Null-slug insert failed");
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);
        assert_eq!(split_sql_statements("  ;  ; ").len(), 0);
    }
}
