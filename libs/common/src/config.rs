//! Client configuration
//!
//! Values come from built-in defaults overridden by `LABTRAC_*` environment
//! variables, e.g. `LABTRAC_API_BASE_URL` or `LABTRAC_REDIS_URL`.

use std::time::Duration;

use ::config::{Config, Environment};
use serde::Deserialize;

use crate::error::ConfigError;

/// Default REST backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
/// Default address of the local Browser Print agent
pub const DEFAULT_BROWSER_PRINT_URL: &str = "http://127.0.0.1:9100";
/// Default namespace for keys in a shared Redis store
pub const DEFAULT_STORE_NAMESPACE: &str = "labtrac";

/// Configuration shared by the session and print binaries
#[derive(Debug, Clone, Deserialize)]
pub struct LabTracConfig {
    /// Base URL of the REST backend, without trailing slash
    pub api_base_url: String,
    /// Redis URL; when absent tabs share an in-memory store
    pub redis_url: Option<String>,
    /// Key prefix inside Redis
    pub store_namespace: String,
    /// Base URL of the Browser Print agent
    pub browser_print_url: String,
    /// Seconds before token expiry at which sessions are ended
    pub expiry_leeway_secs: u64,
}

impl LabTracConfig {
    /// Load the configuration from defaults and the environment
    ///
    /// # Environment Variables
    /// - `LABTRAC_API_BASE_URL` (default: "http://localhost:8080/api")
    /// - `LABTRAC_REDIS_URL` (default: unset)
    /// - `LABTRAC_STORE_NAMESPACE` (default: "labtrac")
    /// - `LABTRAC_BROWSER_PRINT_URL` (default: "http://127.0.0.1:9100")
    /// - `LABTRAC_EXPIRY_LEEWAY_SECS` (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("store_namespace", DEFAULT_STORE_NAMESPACE)?
            .set_default("browser_print_url", DEFAULT_BROWSER_PRINT_URL)?
            .set_default("expiry_leeway_secs", 0_i64)?
            .add_source(Environment::with_prefix("LABTRAC").try_parsing(true))
            .build()?;

        let mut config: LabTracConfig = settings.try_deserialize()?;
        config.api_base_url = normalize_base_url("api_base_url", &config.api_base_url)?;
        config.browser_print_url =
            normalize_base_url("browser_print_url", &config.browser_print_url)?;
        config.redis_url = config.redis_url.filter(|url| !url.trim().is_empty());

        Ok(config)
    }

    pub fn expiry_leeway(&self) -> Duration {
        Duration::from_secs(self.expiry_leeway_secs)
    }
}

fn normalize_base_url(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key,
            message: format!("expected an http(s) URL, got {:?}", value),
        });
    }
    Ok(trimmed.to_string())
}
