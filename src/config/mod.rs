//! Configuration management
//!
//! This module handles loading and parsing configuration for the Minerva blog backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The resulting
//! `Config` is built once at startup and passed into services explicitly;
//! business logic never reads the environment on its own.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Role;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (or ":memory:")
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/minerva.db".to_string()
}

/// Authentication configuration
///
/// Holds the token signing secret and password hashing work factor. The
/// secret must be overridden in any real deployment; the compiled-in default
/// exists only so development setups start without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default = "default_secret")]
    pub secret: String,
    /// Token lifetime in days
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: i64,
    /// Optional token issuer claim
    #[serde(default)]
    pub issuer: Option<String>,
    /// Optional token audience claim
    #[serde(default)]
    pub audience: Option<String>,
    /// Whether self-registration is enabled
    #[serde(default = "default_allow_registration")]
    pub allow_registration: bool,
    /// Role assigned to self-registered accounts
    #[serde(default)]
    pub default_role: Role,
    /// Argon2 memory cost in KiB
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    /// Argon2 lane count
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_expiry_days: default_token_expiry_days(),
            issuer: None,
            audience: None,
            allow_registration: default_allow_registration(),
            default_role: Role::default(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

fn default_secret() -> String {
    "minerva-dev-secret-change-me".to_string()
}

fn default_token_expiry_days() -> i64 {
    10
}

fn default_allow_registration() -> bool {
    true
}

fn default_argon2_memory_kib() -> u32 {
    19 * 1024
}

fn default_argon2_iterations() -> u32 {
    2
}

fn default_argon2_parallelism() -> u32 {
    1
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Public URL prefix under which uploads are served
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum file size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            public_prefix: default_public_prefix(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
        "image/gif".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        // Handle empty file - return defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - MINERVA_SERVER_HOST
    /// - MINERVA_SERVER_PORT
    /// - MINERVA_DATABASE_URL
    /// - MINERVA_AUTH_SECRET
    /// - MINERVA_AUTH_TOKEN_EXPIRY_DAYS
    /// - MINERVA_AUTH_ALLOW_REGISTRATION
    /// - MINERVA_UPLOAD_PATH
    /// - MINERVA_UPLOAD_MAX_FILE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MINERVA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MINERVA_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("MINERVA_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(url) = std::env::var("MINERVA_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("MINERVA_AUTH_SECRET") {
            self.auth.secret = secret;
        }
        if let Ok(days) = std::env::var("MINERVA_AUTH_TOKEN_EXPIRY_DAYS") {
            if let Ok(days) = days.parse() {
                self.auth.token_expiry_days = days;
            }
        }
        if let Ok(allow) = std::env::var("MINERVA_AUTH_ALLOW_REGISTRATION") {
            self.auth.allow_registration = matches!(allow.as_str(), "true" | "1" | "yes");
        }
        if let Ok(path) = std::env::var("MINERVA_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Ok(size) = std::env::var("MINERVA_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = size.parse() {
                self.upload.max_file_size = size;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.secret must not be empty".to_string(),
            ));
        }
        if self.auth.token_expiry_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_expiry_days must be positive".to_string(),
            ));
        }
        if self.auth.argon2_parallelism == 0 || self.auth.argon2_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "argon2 work factor must be non-zero".to_string(),
            ));
        }
        // The CORS layer needs the origin as a header value; catching a bad
        // one here keeps router construction infallible.
        if self
            .server
            .cors_origin
            .parse::<axum::http::HeaderValue>()
            .is_err()
        {
            return Err(ConfigError::ValidationError(format!(
                "server.cors_origin is not a valid header value: {:?}",
                self.server.cors_origin
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/minerva.db");
        assert_eq!(config.auth.token_expiry_days, 10);
        assert!(config.auth.allow_registration);
        assert_eq!(config.upload.max_file_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("/nonexistent/config.yml"))
            .expect("Missing file should yield defaults");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"   \n").unwrap();
        let config = Config::load(file.path()).expect("Empty file should yield defaults");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"server:\n  port: 9000\nauth:\n  secret: test-secret\n  token_expiry_days: 2\n",
        )
        .unwrap();

        let config = Config::load(file.path()).expect("Failed to load config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.secret, "test-secret");
        assert_eq!(config.auth.token_expiry_days, 2);
        // Unspecified sections fall back to defaults
        assert_eq!(config.database.url, "data/minerva.db");
        assert_eq!(config.upload.public_prefix, "/uploads");
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"server: [not a map\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_invalid_expiry_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"auth:\n  token_expiry_days: 0\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_malformed_cors_origin_rejected() {
        let mut config = Config::default();
        config.server.cors_origin = "http://localhost:3000\nX-Evil: 1".to_string();
        assert!(config.validate().is_err());

        config.server.cors_origin = "http://localhost:3000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_upload_type_allowed() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("image/jpeg"));
        assert!(config.is_type_allowed("image/webp"));
        assert!(!config.is_type_allowed("image/svg+xml"));
        assert!(!config.is_type_allowed("application/pdf"));
    }

    #[test]
    fn test_upload_extension_mapping() {
        let config = UploadConfig::default();
        assert_eq!(config.get_extension("image/jpeg"), "jpg");
        assert_eq!(config.get_extension("image/png"), "png");
        assert_eq!(config.get_extension("text/plain"), "bin");
    }

    #[test]
    fn test_default_role_is_user() {
        let config = AuthConfig::default();
        assert_eq!(config.default_role, Role::User);
    }
}
