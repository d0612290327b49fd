//! Configuration for the subscriptions service.
//!
//! Everything comes from environment variables; durations are given in
//! minutes unless the variable name says otherwise.

use std::time::Duration;

use subtrack_core::EngineConfig;
use subtrack_db::PoolSettings;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Service name used in logs
    pub service_name: String,
    /// HTTP bind host
    pub http_host: String,
    /// HTTP bind port
    pub http_port: u16,
    /// gRPC bind host
    pub grpc_host: String,
    /// gRPC bind port
    pub grpc_port: u16,
    /// MySQL connection string
    pub mysql_dsn: String,
    /// Connection pool sizing
    pub pool: PoolSettings,
    /// Log verbosity (tracing filter directive)
    pub log_level: String,
    /// Internal auth service endpoint
    pub auth_grpc_addr: String,
    /// Engine timing knobs
    pub engine: EngineConfig,
    /// Worker tick intervals
    pub jobs: JobsConfig,
    /// Whether to expose Prometheus metrics
    pub metrics_enabled: bool,
}

/// Worker tick intervals
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub auto_renew_interval: Duration,
    pub pending_cleanup_interval: Duration,
    pub expiration_check_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mysql_dsn =
            std::env::var("MYSQL_DSN").map_err(|_| ConfigError::Missing("MYSQL_DSN"))?;

        Ok(Self {
            service_name: get_env("APP_SERVICE_NAME", "subscriptions-service"),
            http_host: get_env("HTTP_HOST", "0.0.0.0"),
            http_port: get_parsed_env("HTTP_PORT", 8080)?,
            grpc_host: get_env("GRPC_HOST", "0.0.0.0"),
            grpc_port: get_parsed_env("GRPC_PORT", 9090)?,
            mysql_dsn,
            pool: PoolSettings {
                max_open_conns: get_parsed_env("MYSQL_MAX_OPEN_CONNS", 10)?,
                max_idle_conns: get_parsed_env("MYSQL_MAX_IDLE_CONNS", 5)?,
                conn_max_lifetime: get_minutes_env("MYSQL_CONN_MAX_LIFETIME_MINUTES", 30)?,
            },
            log_level: get_env("LOG_LEVEL", "info"),
            auth_grpc_addr: get_env("AUTH_SERVICE_GRPC_ADDR", "localhost:9090"),
            engine: EngineConfig {
                renew_before_end: get_chrono_minutes_env("RENEW_BEFORE_END_MINUTES", 1440)?,
                renewal_retry_interval: get_chrono_minutes_env(
                    "RENEWAL_RETRY_INTERVAL_MINUTES",
                    60,
                )?,
                max_renewal_retry_age: get_chrono_minutes_env(
                    "MAX_RENEWAL_RETRY_AGE_MINUTES",
                    10080,
                )?,
                pending_payment_timeout: get_chrono_minutes_env(
                    "PENDING_PAYMENT_TIMEOUT_MINUTES",
                    30,
                )?,
            },
            jobs: JobsConfig {
                auto_renew_interval: get_minutes_env("AUTO_RENEW_INTERVAL_MINUTES", 1)?,
                pending_cleanup_interval: get_minutes_env("PENDING_CLEANUP_INTERVAL_MINUTES", 10)?,
                expiration_check_interval: get_minutes_env(
                    "EXPIRATION_CHECK_INTERVAL_MINUTES",
                    60,
                )?,
            },
            metrics_enabled: get_parsed_env("METRICS_ENABLED", true)?,
        })
    }
}

fn get_env(key: &'static str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn get_parsed_env<T: std::str::FromStr>(
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => {
            value.parse().map_err(|_| ConfigError::Invalid(key))
        }
        _ => Ok(default),
    }
}

fn get_minutes_env(key: &'static str, default_minutes: u64) -> Result<Duration, ConfigError> {
    let minutes: u64 = get_parsed_env(key, default_minutes)?;
    Ok(Duration::from_secs(minutes * 60))
}

fn get_chrono_minutes_env(
    key: &'static str,
    default_minutes: i64,
) -> Result<chrono::Duration, ConfigError> {
    let minutes: i64 = get_parsed_env(key, default_minutes)?;
    Ok(chrono::Duration::minutes(minutes))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
