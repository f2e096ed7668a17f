//! Services layer - Business logic
//!
//! This module contains all business logic services for the Minerva blog backend.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and the filesystem
//! - Handling validation and error cases

pub mod auth;
pub mod password;
pub mod post;
pub mod token;

pub use auth::{AuthOutcome, AuthService, AuthServiceError};
pub use password::PasswordService;
pub use post::{derive_slug, is_valid_slug, PostService, PostServiceError};
pub use token::{Claims, TokenService};
