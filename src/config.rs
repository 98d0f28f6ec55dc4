// Process configuration loaded from environment variables

use std::fmt;
use thiserror::Error;

/// Development-only signing secret. Insecure; rejected in production.
pub const DEFAULT_JWT_SECRET: &str = "your_jwt_secret_key_here";

const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/content_api";
const DEFAULT_TOKEN_TTL: &str = "7d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),

    #[error("JWT_SECRET is unset or uses the insecure default; refusing to start in production")]
    InsecureSecret,
}

/// Deployment mode, read from `APP_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

/// Which store implementation backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage: StorageBackend,
    pub jwt_secret: String,
    /// Token time-to-live in seconds
    pub token_ttl_secs: i64,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value).ok_or(ConfigError::InvalidValue {
                key: "APP_ENV",
                value,
            })?,
            None => Environment::Development,
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 3000u16)?;

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None if environment.is_production() => {
                return Err(ConfigError::MissingInProduction("DATABASE_URL"))
            }
            None => DEFAULT_DATABASE_URL.to_string(),
        };

        let storage = match lookup("STORAGE_BACKEND") {
            None => StorageBackend::Postgres,
            Some(value) => match value.trim().to_lowercase().as_str() {
                "postgres" | "postgresql" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "STORAGE_BACKEND",
                        value,
                    })
                }
            },
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());
        if environment.is_production() && jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureSecret);
        }

        let ttl_raw = lookup("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_TOKEN_TTL.to_string());
        let token_ttl_secs = parse_duration_secs(&ttl_raw).ok_or(ConfigError::InvalidValue {
            key: "JWT_EXPIRES_IN",
            value: ttl_raw.clone(),
        })?;

        let rate_limit_max = parse_or("RATE_LIMIT_MAX", lookup("RATE_LIMIT_MAX"), 100u32)?;
        let rate_limit_window_secs = parse_or(
            "RATE_LIMIT_WINDOW_SECS",
            lookup("RATE_LIMIT_WINDOW_SECS"),
            900u64,
        )?;
        if rate_limit_max == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_MAX",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            host,
            port,
            database_url,
            storage,
            jwt_secret,
            token_ttl_secs,
            rate_limit_max,
            rate_limit_window_secs,
        })
    }

    /// Configuration for tests: in-memory storage, fixed secret
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Test,
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: String::new(),
            storage: StorageBackend::Memory,
            jwt_secret: "test_secret_key_for_testing_purposes".to_string(),
            token_ttl_secs: 7 * 24 * 60 * 60,
            rate_limit_max: 100,
            rate_limit_window_secs: 900,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// Parses a duration such as `3600`, `90s`, `15m`, `12h` or `7d` into seconds
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits.parse().ok()?;

    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    let secs = amount.checked_mul(multiplier)?;
    (secs > 0).then_some(secs)
}
