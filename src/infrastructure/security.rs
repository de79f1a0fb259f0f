// Password hashing, password policy and signed session tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

/// At least eight characters, one of them from the special set.
static SPECIAL_CHARACTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[!@#$%^&*]").expect("valid special character pattern"));

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH && SPECIAL_CHARACTER.is_match(password)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(err) => {
            warn!("failed to parse password hash: {}", err);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// Who a token was issued to. Admin and user tokens are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub kind: PrincipalKind,
    pub token_type: TokenType,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
    /// Unique per token so two tokens minted in the same second still differ.
    pub jti: String,
}

impl Claims {
    pub fn subject_id(&self) -> AppResult<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: config.access_token_expiry,
            refresh_ttl: config.refresh_token_expiry,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn sign(&self, id: i64, username: &str, kind: PrincipalKind, token_type: TokenType) -> AppResult<String> {
        let iat = unix_now();
        let (key, ttl) = match token_type {
            TokenType::Access => (&self.access_encoding, self.access_ttl),
            TokenType::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };
        let claims = Claims {
            sub: id.to_string(),
            kind,
            token_type,
            username: username.to_string(),
            iat,
            exp: iat + ttl.as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn issue_pair(&self, id: i64, username: &str, kind: PrincipalKind) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(id, username, kind, TokenType::Access)?,
            refresh_token: self.sign(id, username, kind, TokenType::Refresh)?,
        })
    }

    fn verify(&self, token: &str, token_type: TokenType) -> AppResult<Claims> {
        let key = match token_type {
            TokenType::Access => &self.access_decoding,
            TokenType::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            AppError::Unauthorized(format!("Invalid {} token: {}", token_type.as_str(), e))
        })?;
        if data.claims.token_type != token_type {
            return Err(AppError::Unauthorized(format!(
                "Invalid {} token",
                token_type.as_str()
            )));
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Refresh)
    }
}

impl TokenType {
    fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_password_policy() {
        assert!(validate_password("secret12!"));
        assert!(validate_password("abcdefg#"));
        assert!(!validate_password("short!"));
        assert!(!validate_password("longenoughbutplain"));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22!").unwrap();
        assert_ne!(hash, "hunter22!");
        assert!(verify_password("hunter22!", &hash));
        assert!(!verify_password("hunter23!", &hash));
        assert!(!verify_password("hunter22!", "not-a-hash"));
    }

    #[test]
    fn test_token_pair_roundtrip() {
        let tokens = TokenService::new(&Config::for_testing().auth);
        let pair = tokens.issue_pair(42, "alice", PrincipalKind::User).unwrap();

        let access = tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.subject_id().unwrap(), 42);
        assert_eq!(access.kind, PrincipalKind::User);
        assert_eq!(access.username, "alice");

        let refresh = tokens.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let tokens = TokenService::new(&Config::for_testing().auth);
        let pair = tokens.issue_pair(7, "bob", PrincipalKind::Admin).unwrap();

        assert!(tokens.verify_access(&pair.refresh_token).is_err());
        assert!(tokens.verify_refresh(&pair.access_token).is_err());
        assert!(tokens.verify_access("garbage").is_err());
    }
}
