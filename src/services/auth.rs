//! Authentication service
//!
//! Implements business logic for account registration and authentication:
//! - Input validation and email normalization
//! - Argon2id credential hashing and verification
//! - Session token minting on success
//!
//! Credential failures collapse into a single `InvalidCredentials` error so
//! responses do not reveal whether an email is registered.

use crate::db::repositories::{AccountRepository, RepoError};
use crate::models::{normalize_email, Account, Role};
use crate::services::password::PasswordService;
use crate::services::token::{Claims, TokenService};
use std::sync::Arc;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 6;

/// Maximum accepted email length
const MAX_EMAIL_LEN: usize = 255;

/// A throwaway Argon2id hash verified when the email is unknown, so the
/// failure path does roughly the same work as a real verification.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$GVMKturYHsxSFevlqACY1z0k8R8H6P5bLqBRDZxYnMI";

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Credentials did not match any account. Deliberately carries no
    /// detail about which part failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The email is already registered
    #[error("Registration failed")]
    EmailTaken,

    /// Self-registration is turned off
    #[error("Registration is disabled")]
    RegistrationDisabled,

    /// Account referenced by a valid token no longer exists
    #[error("Account not found")]
    AccountNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<RepoError> for AuthServiceError {
    fn from(err: RepoError) -> Self {
        AuthServiceError::InternalError(anyhow::Error::new(err))
    }
}

/// Outcome of a successful registration or authentication
#[derive(Debug)]
pub struct AuthOutcome {
    /// The authenticated account
    pub account: Account,
    /// Freshly minted session token
    pub token: String,
}

/// Authentication service
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    passwords: PasswordService,
    tokens: TokenService,
    allow_registration: bool,
    default_role: Role,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        passwords: PasswordService,
        tokens: TokenService,
        allow_registration: bool,
        default_role: Role,
    ) -> Self {
        Self {
            accounts,
            passwords,
            tokens,
            allow_registration,
            default_role,
        }
    }

    /// Register a new account and mint a session token for it
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, AuthServiceError> {
        if !self.allow_registration {
            return Err(AuthServiceError::RegistrationDisabled);
        }

        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;

        let hash = self.passwords.hash(password)?;

        let account = match self.accounts.create(&email, &hash, self.default_role).await {
            Ok(account) => account,
            Err(RepoError::UniqueViolation) => return Err(AuthServiceError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(account_id = account.id, "Account registered");

        let token = self.tokens.mint(&account)?;
        Ok(AuthOutcome { account, token })
    }

    /// Authenticate an account by email and password
    ///
    /// Unknown email and wrong password both come back as
    /// `InvalidCredentials`.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, AuthServiceError> {
        let email = normalize_email(email);

        let account = match self.accounts.find_by_email(&email).await? {
            Some(account) => account,
            None => {
                // Burn comparable time before answering
                let _ = self.passwords.verify(password, DUMMY_HASH);
                return Err(AuthServiceError::InvalidCredentials);
            }
        };

        if !self.passwords.verify(password, &account.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        tracing::debug!(account_id = account.id, "Account authenticated");

        let token = self.tokens.mint(&account)?;
        Ok(AuthOutcome { account, token })
    }

    /// Verify a session token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthServiceError> {
        self.tokens
            .verify(token)
            .map_err(|_| AuthServiceError::InvalidCredentials)
    }

    /// Load the account behind a verified token
    pub async fn current_account(&self, claims: &Claims) -> Result<Account, AuthServiceError> {
        let id = claims
            .account_id()
            .map_err(|_| AuthServiceError::InvalidCredentials)?;

        self.accounts
            .find_by_id(id)
            .await?
            .ok_or(AuthServiceError::AccountNotFound)
    }

    /// Token lifetime in seconds (for the session cookie Max-Age)
    pub fn token_expiry_seconds(&self) -> i64 {
        self.tokens.expiry_seconds()
    }
}

fn validate_email(email: &str) -> Result<(), AuthServiceError> {
    if email.is_empty() {
        return Err(AuthServiceError::ValidationError(
            "Email is required".to_string(),
        ));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(AuthServiceError::ValidationError(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    // Minimal shape check: something before and after a single '@', and a
    // dot in the domain part
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthServiceError::ValidationError(
            "Email format is invalid".to_string(),
        ));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(AuthServiceError::ValidationError(
            "Email format is invalid".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthServiceError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
