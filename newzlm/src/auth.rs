//! Editor login and bearer tokens.
//!
//! There is a single editor account, configured under `[auth]`. A successful login
//! returns an HS256 JWT that the HTTP layer expects in `Authorization: Bearer <token>`.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use common::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_EMAIL: &str = "admin@the-steppe.com";
const DEFAULT_PASSWORD_ENV: &str = "NEWZLM_EDITOR_PASSWORD";
const DEFAULT_SECRET_ENV: &str = "NEWZLM_JWT_SECRET";
const DEFAULT_TTL_HOURS: u64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to issue token: {0}")]
    Issue(#[from] jsonwebtoken::errors::Error),
}

/// JWT claims (subject = editor email)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// How the configured password is checked
pub enum PasswordCheck {
    /// PHC string produced by `hash_password`
    Hash(String),
    /// Plaintext from the environment, for local development
    Plain(String),
    /// No password configured: every login fails
    Disabled,
}

pub struct Authenticator {
    email: String,
    password: PasswordCheck,
    secret: String,
    ttl_hours: u64,
}

impl Authenticator {
    pub fn new(email: impl Into<String>, password: PasswordCheck, secret: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            email: email.into(),
            password,
            secret: secret.into(),
            ttl_hours,
        }
    }

    pub fn from_config(config: Option<&AuthConfig>) -> Self {
        let config = config.cloned().unwrap_or_default();
        let email = config.email.unwrap_or_else(|| DEFAULT_EMAIL.to_string());

        let password_env = config
            .password_env
            .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string());
        let password = match (config.password_hash, std::env::var(&password_env)) {
            (Some(hash), _) => PasswordCheck::Hash(hash),
            (None, Ok(plain)) if !plain.is_empty() => {
                warn!("auth: using plaintext password from {}", password_env);
                PasswordCheck::Plain(plain)
            }
            _ => {
                warn!("auth: no password configured, logins are disabled");
                PasswordCheck::Disabled
            }
        };

        let secret_env = config
            .jwt_secret_env
            .unwrap_or_else(|| DEFAULT_SECRET_ENV.to_string());
        let secret = std::env::var(&secret_env).unwrap_or_else(|_| {
            warn!("auth: {} not set, using development secret", secret_env);
            "dev-secret".into()
        });

        info!(email = %email, "auth: editor account configured");
        Self::new(email, password, secret, config.token_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS))
    }

    /// Check credentials and issue a token.
    pub fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        if !email.trim().eq_ignore_ascii_case(&self.email) || !self.password_matches(password) {
            warn!(email = %email, "auth: login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let now = now_secs();
        let claims = Claims {
            sub: self.email.clone(),
            exp: now + (self.ttl_hours as usize * 3600),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))?;
        info!(email = %self.email, "auth: editor logged in");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("auth: token rejected: {}", e);
                AuthError::InvalidToken
            })
    }

    /// Verify the value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }

    fn password_matches(&self, password: &str) -> bool {
        match &self.password {
            PasswordCheck::Hash(hash) => match PasswordHash::new(hash) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    warn!("auth: configured password hash is invalid: {}", e);
                    false
                }
            },
            PasswordCheck::Plain(expected) => expected == password,
            PasswordCheck::Disabled => false,
        }
    }
}

/// Argon2 PHC string for `[auth] password_hash`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("failed to hash password")?;
    Ok(hash.to_string())
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}
