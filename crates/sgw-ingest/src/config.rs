//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// API Configuration Constants
// ============================================================================

/// Base URL of the real-time weather API.
pub const DEFAULT_API_BASE_URL: &str = "https://api-open.data.gov.sg/v2/real-time/api";

/// Default request timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for a failed continuation request.
pub const DEFAULT_API_PAGE_RETRIES: u32 = 0;

/// Default delay between continuation retries in milliseconds.
pub const DEFAULT_API_RETRY_DELAY_MS: u64 = 1000;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database host, used when `DATABASE_URL` is not set.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "weather";

/// Default database user.
pub const DEFAULT_DB_USER: &str = "postgres";

/// Default minimum connections kept open in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default maximum connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 2;

/// Default number of operations a connection serves before it is recycled.
pub const DEFAULT_DATABASE_MAX_OPERATIONS: u32 = 50;

/// Default idle lifetime of a pooled connection in seconds (5 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default connection acquisition timeout in seconds.
pub const DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Storage Configuration Constants
// ============================================================================

/// Default number of records committed per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 300;

/// Upper bound on the batch size, keeps multi-row inserts under the bind limit.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Default root data directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_retries: u32,
    pub retry_delay_ms: u64,
}

/// Store and pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub max_operations: u32,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub max_lifetime_secs: Option<u64>,
    /// Create the time-series extension and hypertable during schema setup
    pub timescale: bool,
}

/// Local artifact and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub batch_size: usize,
    pub data_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            page_retries: DEFAULT_API_PAGE_RETRIES,
            retry_delay_ms: DEFAULT_API_RETRY_DELAY_MS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl DatabaseConfig {
    /// Config with default pool settings for the given connection URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            max_operations: DEFAULT_DATABASE_MAX_OPERATIONS,
            idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            acquire_timeout_secs: DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
            max_lifetime_secs: None,
            timescale: true,
        }
    }
}

impl StorageConfig {
    /// Directory holding one subdirectory of raw artifacts per parameter
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("weather")
    }

    /// Path of the download ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("download_metadata.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Build a connection URL from the discrete `SGW_DB_*` variables
fn database_url() -> String {
    let host = std::env::var("SGW_DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string());
    let port: u16 = env_parse("SGW_DB_PORT", DEFAULT_DB_PORT);
    let name = std::env::var("SGW_DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string());
    let user = std::env::var("SGW_DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string());

    match std::env::var("SGW_DB_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, name)
        },
        _ => format!("postgresql://{}@{}:{}/{}", user, host, port, name),
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            api: ApiConfig {
                base_url: std::env::var("SGW_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                timeout_secs: env_parse("SGW_API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS),
                page_retries: env_parse("SGW_API_PAGE_RETRIES", DEFAULT_API_PAGE_RETRIES),
                retry_delay_ms: env_parse("SGW_API_RETRY_DELAY_MS", DEFAULT_API_RETRY_DELAY_MS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or_else(|_| database_url()),
                min_connections: env_parse(
                    "SGW_DB_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                max_connections: env_parse(
                    "SGW_DB_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                max_operations: env_parse("SGW_DB_MAX_OPERATIONS", DEFAULT_DATABASE_MAX_OPERATIONS),
                idle_timeout_secs: env_parse(
                    "SGW_DB_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
                acquire_timeout_secs: env_parse(
                    "SGW_DB_ACQUIRE_TIMEOUT",
                    DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
                ),
                max_lifetime_secs: std::env::var("SGW_DB_MAX_LIFETIME")
                    .ok()
                    .and_then(|s| s.parse().ok()),
                timescale: env_parse("SGW_DB_TIMESCALE", true),
            },
            storage: StorageConfig {
                batch_size: env_parse("SGW_BATCH_SIZE", DEFAULT_BATCH_SIZE),
                data_dir: std::env::var("SGW_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.base_url.is_empty() {
            anyhow::bail!("API base URL cannot be empty");
        }

        if self.api.timeout_secs == 0 {
            anyhow::bail!("API timeout must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.database.max_operations == 0 {
            anyhow::bail!("Database max_operations must be greater than 0");
        }

        if self.storage.batch_size == 0 || self.storage.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("Batch size must be between 1 and {}", MAX_BATCH_SIZE);
        }

        Ok(())
    }
}
