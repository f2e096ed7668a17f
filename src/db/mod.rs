//! Database layer
//!
//! SQLite-backed persistence via sqlx. The pool is created from
//! configuration at startup; repositories borrow it behind `Arc`.
//!
//! # Usage
//!
//! ```ignore
//! use minerva::config::DatabaseConfig;
//! use minerva::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
