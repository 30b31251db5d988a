//! Configuration loading
//!
//! All configuration comes from the environment and is validated once at
//! process start. Missing required values abort boot with `Error::Config`;
//! nothing re-reads the environment after startup.

use crate::{Error, Result};

/// Production diploma archive, used when `ARCHIVE_BASE_URL` is not set
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://diploma.olimpiada.ru";

const DEFAULT_RMQ_PORT: &str = "5672";
const DEFAULT_QUEUE: &str = "olymps";
const DEFAULT_SUCCESS_QUEUE: &str = "olymps_success";
const DEFAULT_PREFETCH: &str = "1";
const DEFAULT_DB_SCHEME: &str = "http";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Broker connection and queue naming
#[derive(Debug, Clone)]
pub struct RabbitConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Inbound lookup-request queue
    pub queue: String,
    /// Outbound success-notification queue
    pub success_queue: String,
    /// Unacknowledged messages a consumer may hold; 1 keeps processing serial
    pub prefetch_count: u16,
}

impl RabbitConfig {
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Downstream database API endpoint
#[derive(Debug, Clone)]
pub struct DatabaseApiConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    /// Optional bearer token sent on every submission
    pub token: Option<String>,
}

impl DatabaseApiConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Public diploma archive endpoint
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub base_url: String,
}

/// Full worker configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rabbit: RabbitConfig,
    pub db_api: DatabaseApiConfig,
    pub archive: ArchiveConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Load and validate configuration from the environment.
    ///
    /// Required: `RMQ_USER`, `RMQ_PASS`, `RMQ_HOST`, `DB_SERVER_HOST`,
    /// `DB_SERVER_PORT`. Everything else has a default.
    pub fn from_env() -> Result<Self> {
        let rabbit = RabbitConfig {
            username: require_env("RMQ_USER")?,
            password: require_env("RMQ_PASS")?,
            host: require_env("RMQ_HOST")?,
            port: parse_u16(env_or("RMQ_PORT", DEFAULT_RMQ_PORT), "RMQ_PORT")?,
            queue: env_or("RMQ_QUEUE", DEFAULT_QUEUE),
            success_queue: env_or("RMQ_SUCCESS_QUEUE", DEFAULT_SUCCESS_QUEUE),
            prefetch_count: parse_u16(env_or("RMQ_PREFETCH", DEFAULT_PREFETCH), "RMQ_PREFETCH")?,
        };

        let db_api = DatabaseApiConfig {
            host: require_env("DB_SERVER_HOST")?,
            port: parse_u16(require_env("DB_SERVER_PORT")?, "DB_SERVER_PORT")?,
            scheme: env_or("DB_SERVER_SCHEME", DEFAULT_DB_SCHEME),
            token: optional_env("DB_API_TOKEN"),
        };

        let archive = ArchiveConfig {
            base_url: env_or("ARCHIVE_BASE_URL", DEFAULT_ARCHIVE_BASE_URL),
        };

        let log_level = env_or("LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase();

        Ok(Self {
            rabbit,
            db_api,
            archive,
            log_level,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "required environment variable {name} is not set"
        ))),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    optional_env(name).unwrap_or_else(|| default.to_string())
}

fn parse_u16(value: String, name: &str) -> Result<u16> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "environment variable {name} must be an integer, got: {value:?}"
        ))
    })
}
