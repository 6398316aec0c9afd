use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_ALLOCATION_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_TRANSACTION_NUMBER_PREFIX: &str = "PT";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development/staging/production)
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Comma-separated list of allowed CORS origins; permissive when unset
    /// in development.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Bounded retry count for installment allocation conflicts.
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_allocation_retry_attempts")]
    pub allocation_retry_attempts: u32,

    /// Prefix for generated installment transaction numbers.
    #[validate(length(min = 1, max = 8))]
    #[serde(default = "default_transaction_number_prefix")]
    pub transaction_number_prefix: String,

    /// Interval for the integration sweep worker; disabled when unset.
    #[serde(default)]
    pub integration_sweep_seconds: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_allocation_retry_attempts() -> u32 {
    DEFAULT_ALLOCATION_RETRY_ATTEMPTS
}

fn default_transaction_number_prefix() -> String {
    DEFAULT_TRANSACTION_NUMBER_PREFIX.to_string()
}

impl AppConfig {
    /// Convenience constructor used by tests and embedded setups.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            cors_allowed_origins: None,
            allocation_retry_attempts: default_allocation_retry_attempts(),
            transaction_number_prefix: default_transaction_number_prefix(),
            integration_sweep_seconds: None,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("dev")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("ledgerline_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads configuration from `config/{default,<env>}.toml` overlaid with
/// `APP__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://ledgerline.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructor_applies_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            18_080,
            "test".into(),
        );
        assert_eq!(cfg.allocation_retry_attempts, 3);
        assert_eq!(cfg.transaction_number_prefix, "PT");
        assert!(cfg.integration_sweep_seconds.is_none());
        assert!(!cfg.auto_migrate);
    }

    #[test]
    fn retry_attempts_are_bounded() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            18_080,
            "test".into(),
        );
        cfg.allocation_retry_attempts = 0;
        assert!(cfg.validate().is_err());
        cfg.allocation_retry_attempts = 3;
        assert!(cfg.validate().is_ok());
    }
}
