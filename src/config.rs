use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub billing: BillingConfig,
    pub sms: SmsConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub max_body_bytes: usize,
    pub public_app_url: String,
    pub node_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_expiry: Duration,
    pub refresh_token_secret: String,
    pub refresh_token_expiry: Duration,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Directory for the local media backend used when no cloud account is configured.
    pub local_dir: String,
}

impl MediaConfig {
    pub fn cloud_credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.cloud_name, &self.api_key, &self.api_secret) {
            (Some(name), Some(key), Some(secret)) => Some((name, key, secret)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    /// Contestant fee in the smallest currency unit.
    pub contestant_fee: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub verify_sid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub bootstrap_usernames: Vec<String>,
    pub bootstrap_password: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses expiry strings such as `900`, `15m`, `12h` or `10d`.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("empty expiry");
    }
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        _ => (raw, 's'),
    };
    let value: u64 = digits
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid expiry '{}': {}", raw, e))?;
    let seconds = match unit {
        's' => value,
        'm' => value * 60,
        'h' => value * 60 * 60,
        'd' => value * 60 * 60 * 24,
        other => anyhow::bail!("unknown expiry unit '{}' in '{}'", other, raw),
    };
    Ok(Duration::from_secs(seconds))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", "sqlite:data/voting_platform.db?mode=rwc"),
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10),
            },
            server: ServerConfig {
                host: var_or("SERVER_HOST", "0.0.0.0"),
                port: var_or("SERVER_PORT", "8282").parse().unwrap_or(8282),
                cors_origin: var_or("CORS_ORIGIN", "http://localhost:5173"),
                max_body_bytes: var_or("MAX_BODY_BYTES", "26214400")
                    .parse()
                    .unwrap_or(25 * 1024 * 1024),
                public_app_url: var_or("PUBLIC_APP_URL", "http://localhost:5173"),
                node_id: var_or("NODE_ID", "0").parse().unwrap_or(0),
            },
            auth: AuthConfig {
                access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                    .map_err(|_| anyhow::anyhow!("ACCESS_TOKEN_SECRET must be set"))?,
                access_token_expiry: parse_expiry(&var_or("ACCESS_TOKEN_EXPIRY", "1d"))?,
                refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                    .map_err(|_| anyhow::anyhow!("REFRESH_TOKEN_SECRET must be set"))?,
                refresh_token_expiry: parse_expiry(&var_or("REFRESH_TOKEN_EXPIRY", "10d"))?,
                cookie_secure: var_or("COOKIE_SECURE", "true").parse().unwrap_or(true),
            },
            media: MediaConfig {
                cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
                api_key: optional_var("CLOUDINARY_API_KEY"),
                api_secret: optional_var("CLOUDINARY_API_SECRET"),
                local_dir: var_or("MEDIA_DIR", "public/uploads"),
            },
            billing: BillingConfig {
                api_base: var_or("STRIPE_API_BASE", "https://api.stripe.com"),
                secret_key: var_or("STRIPE_SECRET_KEY", ""),
                webhook_secret: var_or("STRIPE_WEBHOOK_SECRET", ""),
                contestant_fee: var_or("CONTESTANT_SUBSCRIPTION_FEE", "1000")
                    .parse()
                    .unwrap_or(1000),
                currency: var_or("BILLING_CURRENCY", "usd"),
            },
            sms: SmsConfig {
                api_base: var_or("TWILIO_VERIFY_API_BASE", "https://verify.twilio.com"),
                account_sid: var_or("TWILIO_ACCOUNT_SID", ""),
                auth_token: var_or("TWILIO_AUTH_TOKEN", ""),
                verify_sid: var_or("TWILIO_VERIFY_SID", ""),
            },
            admin: AdminConfig {
                bootstrap_usernames: var_or("ADMIN_BOOTSTRAP_USERNAMES", "admin1,admin2")
                    .split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                bootstrap_password: var_or("ADMIN_BOOTSTRAP_PASSWORD", "admin123$"),
            },
        })
    }

    /// Configuration used by tests and local tooling: in-memory database, fixed secrets.
    pub fn for_testing() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origin: "http://localhost:5173".to_string(),
                max_body_bytes: 5 * 1024 * 1024,
                public_app_url: "http://localhost:5173".to_string(),
                node_id: 1,
            },
            auth: AuthConfig {
                access_token_secret: "test-access-secret".to_string(),
                access_token_expiry: Duration::from_secs(15 * 60),
                refresh_token_secret: "test-refresh-secret".to_string(),
                refresh_token_expiry: Duration::from_secs(24 * 60 * 60),
                cookie_secure: false,
            },
            media: MediaConfig {
                cloud_name: None,
                api_key: None,
                api_secret: None,
                local_dir: "public/uploads".to_string(),
            },
            billing: BillingConfig {
                api_base: "http://127.0.0.1:9".to_string(),
                secret_key: "sk_test".to_string(),
                webhook_secret: "whsec_test".to_string(),
                contestant_fee: 1000,
                currency: "usd".to_string(),
            },
            sms: SmsConfig {
                api_base: "http://127.0.0.1:9".to_string(),
                account_sid: "AC_test".to_string(),
                auth_token: "token".to_string(),
                verify_sid: "VA_test".to_string(),
            },
            admin: AdminConfig {
                bootstrap_usernames: vec!["admin1".to_string(), "admin2".to_string()],
                bootstrap_password: "admin123$".to_string(),
            },
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_units() {
        assert_eq!(parse_expiry("900").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_expiry("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_expiry("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_expiry("10d").unwrap(), Duration::from_secs(864_000));
    }

    #[test]
    fn test_parse_expiry_rejects_garbage() {
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("abc").is_err());
        assert!(parse_expiry("5w").is_err());
    }

    #[test]
    fn test_cloud_credentials_require_all_parts() {
        let mut media = Config::for_testing().media;
        assert!(media.cloud_credentials().is_none());
        media.cloud_name = Some("demo".into());
        media.api_key = Some("key".into());
        assert!(media.cloud_credentials().is_none());
        media.api_secret = Some("secret".into());
        assert_eq!(media.cloud_credentials(), Some(("demo", "key", "secret")));
    }
}
