//! Account model
//!
//! This module provides:
//! - `Account` entity representing an identity record
//! - `Role` enum for the closed set of account roles
//!
//! The password hash is carried internally but must never be serialized
//! into an API response; handlers convert to a response type that omits it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: i64,
    /// Normalized email address (trimmed, lowercased)
    pub email: String,
    /// Argon2id password hash (PHC string format)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account role
    pub role: Role,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Account role
///
/// Closed enumeration: unknown role strings are rejected at the boundary
/// rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standard account
    #[default]
    User,
    /// Elevated account with admin access
    Admin,
}

impl Role {
    /// Convert role to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse role from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether this role grants admin access
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize an email address for storage and lookup
///
/// Emails are compared case-insensitively, so every path into the store
/// goes through this first.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_role_default() {
        assert_eq!(Role::default(), Role::User);
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let account = Account {
            id: 1,
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }
}
