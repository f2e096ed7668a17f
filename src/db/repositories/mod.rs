//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.
//!
//! Repositories return `RepoError` instead of an opaque error so callers can
//! react to constraint violations. The slug retry logic in the post service
//! depends on telling a unique violation apart from any other failure.

use thiserror::Error;

pub mod account;
pub mod post;

pub use account::{AccountRepository, SqlxAccountRepository};
pub use post::{PostRepository, SqlxPostRepository};

/// Repository error
#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique constraint rejected the write (duplicate email or slug)
    #[error("unique constraint violation")]
    UniqueViolation,

    /// The referenced record does not exist
    #[error("record not found")]
    NotFound,

    /// A stored value could not be decoded into its model type
    #[error("invalid stored value: {0}")]
    InvalidData(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
                return RepoError::UniqueViolation;
            }
        }
        RepoError::Database(err)
    }
}

impl RepoError {
    /// Whether this error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepoError::UniqueViolation)
    }
}

/// Convenience alias for repository results
pub type RepoResult<T> = Result<T, RepoError>;
