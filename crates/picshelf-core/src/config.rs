//! Configuration module
//!
//! Configuration is read once at startup from the environment (optionally seeded from a
//! `.env` file) and then passed by reference to every component that needs it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const SERVER_HOST: &str = "127.0.0.1";
const SERVER_PORT: u16 = 4700;
const DATABASE_URL: &str = "./tmp/main.db";
const DB_MAX_CONNECTIONS: u32 = 5;
const DB_TIMEOUT_SECS: u64 = 30;
const STORAGE_ROOT: &str = "./storage";
const UPLOAD_MAX_SIZE_MB: usize = 10;
const RECONCILE_INTERVAL_SECS: u64 = 300;
const RECONCILE_PAGE_SIZE: i64 = 10;
const HTTP_TIMEOUT_SECS: u64 = 15;
const HTTP_RATE_LIMIT_REQUESTS: u32 = 100;
const HTTP_RATE_LIMIT_WINDOW_SECS: u64 = 10;

/// Console/file output format for the tracing subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    pub storage_root: PathBuf,
    pub upload_max_bytes: usize,
    pub reconcile_enabled: bool,
    pub reconcile_interval_secs: u64,
    pub reconcile_page_size: i64,
    pub http_timeout_secs: u64,
    pub http_rate_limit_requests: u32,
    pub http_rate_limit_window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: SERVER_HOST.to_string(),
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            database_url: DATABASE_URL.to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECS,
            log_level: "debug".to_string(),
            log_format: LogFormat::Compact,
            log_file: None,
            storage_root: PathBuf::from(STORAGE_ROOT),
            upload_max_bytes: UPLOAD_MAX_SIZE_MB * 1024 * 1024,
            reconcile_enabled: true,
            reconcile_interval_secs: RECONCILE_INTERVAL_SECS,
            reconcile_page_size: RECONCILE_PAGE_SIZE,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            http_rate_limit_requests: HTTP_RATE_LIMIT_REQUESTS,
            http_rate_limit_window_secs: HTTP_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

/// `None` when the size does not fit in `usize`.
fn mb_to_bytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present; a missing
    /// file is not an error.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let cors_origins: Vec<String> = env_string("CORS_ORIGINS")
            .or_else(|| env_string("CORS"))
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let upload_max_mb = env_or("UPLOAD_MAX_SIZE_MB", UPLOAD_MAX_SIZE_MB);
        let upload_max_bytes = mb_to_bytes(upload_max_mb).ok_or_else(|| {
            anyhow::anyhow!("UPLOAD_MAX_SIZE_MB is too large: {}", upload_max_mb)
        })?;

        let config = Config {
            server_host: env_string("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env_or("PORT", SERVER_PORT),
            cors_origins,
            environment,
            database_url: env_string("SQL_DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            log_level: env_string("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env_string("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Compact),
            log_file: env_string("LOG_FILE").map(PathBuf::from),
            storage_root: env_string("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            upload_max_bytes,
            reconcile_enabled: env_or("RECONCILE_ENABLED", true),
            reconcile_interval_secs: env_or("RECONCILE_INTERVAL_SECS", RECONCILE_INTERVAL_SECS),
            reconcile_page_size: env_or("RECONCILE_PAGE_SIZE", RECONCILE_PAGE_SIZE),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS),
            http_rate_limit_requests: env_or("HTTP_RATE_LIMIT_REQUESTS", HTTP_RATE_LIMIT_REQUESTS),
            http_rate_limit_window_secs: env_or(
                "HTTP_RATE_LIMIT_WINDOW_SECS",
                HTTP_RATE_LIMIT_WINDOW_SECS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Fail fast on values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_max_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_SIZE_MB cannot be 0"));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(anyhow::anyhow!("RECONCILE_INTERVAL_SECS cannot be 0"));
        }
        if self.reconcile_page_size <= 0 {
            return Err(anyhow::anyhow!("RECONCILE_PAGE_SIZE must be positive"));
        }
        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("Database max connections cannot be 0"));
        }
        if self.http_rate_limit_window_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_RATE_LIMIT_WINDOW_SECS cannot be 0"));
        }
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn upload_max_mb(&self) -> usize {
        self.upload_max_bytes / 1024 / 1024
    }
}
