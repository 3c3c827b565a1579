//! Environment-driven configuration, read once at startup.

use std::time::Duration;

use crate::error::AppError;

/// Default per-call database timeout in milliseconds.
const DEFAULT_DB_TIMEOUT_MS: u64 = 5_000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Per-call timeout for database and event store operations.
    pub db_timeout: Duration,
    /// OTLP collector endpoint; tracing stays local-only when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the environment.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".into()))?;
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_owned())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let db_timeout_ms: u64 = std::env::var("DB_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_DB_TIMEOUT_MS.to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("DB_TIMEOUT_MS must be a valid u64: {e}")))?;
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        Ok(Self {
            database_url,
            host,
            port,
            db_timeout: Duration::from_millis(db_timeout_ms),
            otlp_endpoint,
        })
    }
}
