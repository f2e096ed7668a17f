//! Account repository
//!
//! Database operations for accounts.
//!
//! This module provides:
//! - `AccountRepository` trait defining the interface for account data access
//! - `SqlxAccountRepository` implementing the trait for SQLite

use crate::db::repositories::{RepoError, RepoResult};
use crate::models::{Account, Role};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Account repository trait
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a new account
    ///
    /// Returns `RepoError::UniqueViolation` if the email is already taken.
    async fn create(&self, email: &str, password_hash: &str, role: Role) -> RepoResult<Account>;

    /// Find an account by email
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>>;

    /// Find an account by ID
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Account>>;
}

/// SQLx-based account repository implementation
pub struct SqlxAccountRepository {
    pool: SqlitePool,
}

impl SqlxAccountRepository {
    /// Create a new SQLx account repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn AccountRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AccountRepository for SqlxAccountRepository {
    async fn create(&self, email: &str, password_hash: &str, role: Role) -> RepoResult<Account> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Account {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: now,
        })
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM accounts
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_account(&row)?)),
            None => Ok(None),
        }
    }

}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> RepoResult<Account> {
    let role_str: String = row.get("role");
    let role = Role::parse(&role_str)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown role: {}", role_str)))?;

    Ok(Account {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        created_at: row.get("created_at"),
    })
}
