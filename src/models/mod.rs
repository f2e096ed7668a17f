//! Data models
//!
//! Entity types and input/output containers shared between the service
//! and persistence layers.

pub mod account;
pub mod post;

pub use account::{normalize_email, Account, Role};
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostCategory, PostQuery, UpdatePostInput,
};
