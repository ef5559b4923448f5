use std::time::Duration;

use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Redis connection used by the session cache
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Prepended to every refresh token before it is used as a key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound for a single Redis round-trip
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl RedisSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    /// Process-local cache, only valid for a single instance
    Memory,
}

#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct CacheSettings {
    #[serde(default)]
    pub backend: CacheBackend,
}

/// JWT authentication settings
///
/// Either `secret` (HS256) or both PEM paths (RS256) must be set.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub public_key_path: Option<String>,
    pub access_token_expiry: i64,  // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl JwtSettings {
    pub fn access_ttl(&self) -> Result<Duration, ConfigError> {
        positive_seconds("jwt.access_token_expiry", self.access_token_expiry)
    }

    pub fn refresh_ttl(&self) -> Result<Duration, ConfigError> {
        positive_seconds("jwt.refresh_token_expiry", self.refresh_token_expiry)
    }
}

/// Ten years; token lifetimes beyond that are treated as misconfiguration
const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn positive_seconds(name: &str, value: i64) -> Result<Duration, ConfigError> {
    u64::try_from(value)
        .ok()
        .filter(|secs| *secs > 0 && *secs <= MAX_TOKEN_TTL_SECS)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_TOKEN_TTL_SECS, value
            ))
        })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "refresh:".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    500
}

fn default_issuer() -> String {
    "tokenward".to_string()
}

/// Load settings from an optional `configuration.{yaml,toml,json}` file,
/// overridden by `APP__SECTION__KEY` environment variables
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(environment())
        .build()?;
    settings.try_deserialize::<Settings>()
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("__")
        .separator("__")
}
