use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env as std_env;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// File-storage configuration, injected into the storage component at
/// construction. `storage_type` selects between the local filesystem and a
/// mirrored FTPS remote.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct StorageConfig {
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    #[serde(default)]
    pub ftp_host: Option<String>,
    #[serde(default)]
    pub ftp_user: Option<String>,
    #[serde(default)]
    pub ftp_password: Option<String>,
    /// Remote base directory files are uploaded under.
    #[serde(default = "default_base_public_path")]
    pub base_public_path: String,
    /// Public URL prefix returned for remotely stored files.
    #[serde(default = "default_base_public_url")]
    pub base_public_url: String,
    /// Local directory uploads land in (also the FTPS fallback target).
    #[serde(default = "default_local_root")]
    pub local_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: default_storage_type(),
            ftp_host: None,
            ftp_user: None,
            ftp_password: None,
            base_public_path: default_base_public_path(),
            base_public_url: default_base_public_url(),
            local_root: default_local_root(),
        }
    }
}

fn default_storage_type() -> String {
    "local".to_string()
}
fn default_base_public_path() -> String {
    "/uploads".to_string()
}
fn default_base_public_url() -> String {
    "http://localhost:8080/uploads".to_string()
}
fn default_local_root() -> String {
    "uploads".to_string()
}

/// Application configuration, loaded once at startup.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret (64+ characters)
    #[validate(length(min = 64))]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_expiration")]
    pub refresh_token_expiration: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
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

    /// Basic-auth credentials protecting the Swagger UI
    #[serde(default = "default_docs_user")]
    pub docs_user: String,
    #[serde(default = "default_docs_password")]
    pub docs_password: String,

    /// File storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_jwt_expiration() -> u64 {
    15 * 60
}
fn default_refresh_expiration() -> u64 {
    7 * 24 * 60 * 60
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_docs_user() -> String {
    "docs".to_string()
}
fn default_docs_password() -> String {
    "docs".to_string()
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Load configuration from layered sources:
/// 1. `config/default.toml`
/// 2. environment-specific `config/{env}.toml`
/// 3. environment variables prefixed `APP`, `__` as separator
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let environment = std_env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("environment", environment.clone())?
        .set_default("database_url", "sqlite::memory:")?
        .set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;

    let default_path = format!("{CONFIG_DIR}/default");
    if Path::new(&format!("{default_path}.toml")).exists() {
        builder = builder.add_source(File::with_name(&default_path));
    }
    let env_path = format!("{CONFIG_DIR}/{environment}");
    if Path::new(&format!("{env_path}.toml")).exists() {
        builder = builder.add_source(File::with_name(&env_path).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}

/// Initialise the tracing subscriber. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("storeops_api={level},tower_http=debug");
    let filter_directive = std_env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_config_defaults_to_local() {
        let cfg = StorageConfig::default();
        assert_eq!(cfg.storage_type, "local");
        assert!(cfg.ftp_host.is_none());
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let cfg = AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "short".into(),
            jwt_expiration: default_jwt_expiration(),
            refresh_token_expiration: default_refresh_expiration(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            docs_user: default_docs_user(),
            docs_password: default_docs_password(),
            storage: StorageConfig::default(),
        };
        assert!(cfg.validate().is_err());
    }
}
