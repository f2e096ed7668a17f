//! Password hashing module
//!
//! This module provides secure password hashing and verification using Argon2id,
//! which is the recommended variant for password hashing.
//!
//! # Security
//!
//! - Uses Argon2id variant (hybrid of Argon2i and Argon2d)
//! - Work factor comes from `AuthConfig` so deployments can tune it
//! - Generates random salt for each password hash
//!
//! Verification reads the parameters embedded in the stored PHC string, so
//! hashes created under an older work factor keep verifying after a config
//! change.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::AuthConfig;

/// Password hashing service carrying the configured Argon2id work factor.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Create a password service from the auth configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured work factor is outside the ranges
    /// the argon2 crate accepts.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password using Argon2id.
    ///
    /// # Returns
    ///
    /// The password hash as a PHC string (includes algorithm, parameters,
    /// salt, and hash).
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
            .context("Password hashing failed")?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// # Returns
    ///
    /// `true` if the password matches the hash, `false` otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if the hash format is invalid
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
            .context("Failed to parse password hash")?;

        // Parameters come from the PHC string, not from self.argon2
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
                .context("Password verification error"),
        }
    }
}
