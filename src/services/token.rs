//! Session token service
//!
//! Stateless session tokens signed with HMAC-SHA256 (JWT). The service is
//! the only place that touches the signing secret; handlers deal in
//! `Claims` values.
//!
//! Verification pins the algorithm to HS256. Tokens carrying any other
//! algorithm in their header, including "none", fail validation outright.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::models::{Account, Role};

/// Clock skew tolerance when validating expiry, in seconds.
const LEEWAY_SECS: u64 = 5;

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID as a string)
    pub sub: String,
    /// Account email at mint time
    pub email: String,
    /// Account role at mint time
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Token audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    /// Parse the subject back into an account ID
    pub fn account_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid subject claim: {}", self.sub))
    }
}

/// Token service for minting and verifying session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_days: i64,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenService {
    /// Create a token service from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry_days: config.token_expiry_days,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Mint a session token for an account
    pub fn mint(&self, account: &Account) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::days(self.expiry_days);

        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        Ok(token)
    }

    /// Validate and decode a session token
    ///
    /// Checks the signature, the pinned algorithm, expiry (with a small
    /// leeway for clock skew), and the issuer/audience claims when they are
    /// configured.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        validation.validate_exp = true;
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        if let Some(aud) = &self.audience {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Token lifetime in seconds (for the session cookie Max-Age)
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_days * 24 * 60 * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> Account {
        Account {
            id: 42,
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
        }
    }

    fn test_config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret: secret.to_string(),
            token_expiry_days: 10,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_mint_and_verify_round_trip() {
        let service = TokenService::new(&test_config("test-secret"));
        let token = service.mint(&test_account()).expect("Mint failed");

        let claims = service.verify(&token).expect("Verify failed");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.account_id().unwrap(), 42);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = TokenService::new(&test_config("secret-a"));
        let other = TokenService::new(&test_config("secret-b"));

        let token = service.mint(&test_account()).expect("Mint failed");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = TokenService::new(&test_config("test-secret"));
        let token = service.mint(&test_account()).expect("Mint failed");

        // Flip a character in the payload segment
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let payload = parts[1].clone();
        parts[1] = if payload.starts_with('A') {
            format!("B{}", &payload[1..])
        } else {
            format!("A{}", &payload[1..])
        };
        let tampered = parts.join(".");

        assert!(service.verify(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = test_config("test-secret");
        let service = TokenService::new(&config);

        // Encode a token that expired a minute ago, beyond the leeway
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            email: "test@example.com".to_string(),
            role: Role::User,
            iat: now - 120,
            exp: now - 60,
            iss: None,
            aud: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("Encode failed");

        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let config = test_config("test-secret");
        let service = TokenService::new(&config);

        // Same secret, different HMAC algorithm in the header
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            email: "test@example.com".to_string(),
            role: Role::User,
            iat: now,
            exp: now + 3600,
            iss: None,
            aud: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("Encode failed");

        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let mut config = test_config("test-secret");
        config.issuer = Some("minerva".to_string());
        let service = TokenService::new(&config);

        let mut other_config = test_config("test-secret");
        other_config.issuer = Some("someone-else".to_string());
        let other = TokenService::new(&other_config);

        let token = other.mint(&test_account()).expect("Mint failed");
        assert!(service.verify(&token).is_err());

        let own = service.mint(&test_account()).expect("Mint failed");
        assert!(service.verify(&own).is_ok());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = TokenService::new(&test_config("test-secret"));
        assert!(service.verify("not-a-token").is_err());
        assert!(service.verify("").is_err());
    }

    #[test]
    fn test_expiry_seconds() {
        let service = TokenService::new(&test_config("test-secret"));
        assert_eq!(service.expiry_seconds(), 10 * 24 * 60 * 60);
    }
}
