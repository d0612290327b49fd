//! Database connection pool

use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

/// Database connection pool type alias
pub type DbPool = MySqlPool;

/// Pool sizing and lifetime settings
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open_conns: 10,
            max_idle_conns: 5,
            conn_max_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

/// Create a new database connection pool
pub async fn create_pool(dsn: &str, settings: &PoolSettings) -> Result<DbPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(settings.max_open_conns)
        .min_connections(settings.max_idle_conns)
        .max_lifetime(settings.conn_max_lifetime)
        .connect(dsn)
        .await
}
