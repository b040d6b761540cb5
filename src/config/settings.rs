//! Application settings and configuration
//!
//! Settings are loaded from environment variables (and a `.env` file when
//! present) with sensible defaults. They are passed explicitly to the code
//! that reads them; nothing here is process-global.

use crate::error::ApiError;
use crate::services::api_pool::{ApiKeyCredential, ApiKeyCredentialConfig, ApiPool};
use crate::utils::retry::{RetryConfig, DEFAULT_BACKOFF, DEFAULT_DELAY};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Retry configuration as read from the environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    pub delay_ms: u64,
    pub backoff: f64,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY.as_millis() as u64,
            backoff: DEFAULT_BACKOFF,
            max_delay_ms: None,
            max_attempts: None,
            jitter: false,
        }
    }
}

impl RetrySettings {
    /// Build a validated retry config
    pub fn to_config(&self) -> Result<RetryConfig, ApiError> {
        let mut config = RetryConfig::new(Duration::from_millis(self.delay_ms), self.backoff)?
            .with_jitter(self.jitter);
        if let Some(max) = self.max_delay_ms {
            config = config.with_max_delay(Duration::from_millis(max));
        }
        if let Some(attempts) = self.max_attempts {
            config = config.with_max_attempts(attempts);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub app_name: String,
    pub log_level: String,

    /// Promote validation warnings to `ApiError::BadObject`
    pub strict_mode: bool,

    pub retry: RetrySettings,

    #[serde(skip_serializing)]
    pub credentials: Vec<ApiKeyCredentialConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "api-failover".to_string(),
            log_level: "info".to_string(),
            strict_mode: false,
            retry: RetrySettings::default(),
            credentials: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self, ApiError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetrySettings::default();
        let settings = Self {
            app_name: lookup("APP_NAME").unwrap_or_else(|| "api-failover".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            strict_mode: parse_or(&lookup, "STRICT_MODE", false)?,
            retry: RetrySettings {
                delay_ms: parse_or(&lookup, "RETRY_DELAY_MS", defaults.delay_ms)?,
                backoff: parse_or(&lookup, "RETRY_BACKOFF", defaults.backoff)?,
                max_delay_ms: parse_opt(&lookup, "RETRY_MAX_DELAY_MS")?,
                max_attempts: parse_opt(&lookup, "RETRY_MAX_ATTEMPTS")?,
                jitter: parse_or(&lookup, "RETRY_JITTER", defaults.jitter)?,
            },
            credentials: load_credentials(&lookup)?,
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    fn validate(&self) -> Result<(), ApiError> {
        self.retry
            .to_config()
            .map_err(|e| ApiError::Config(format!("invalid retry settings: {}", e)))?;

        if self.credentials.iter().any(|c| c.api_key.is_empty()) {
            return Err(ApiError::Config("credential with empty api_key".to_string()));
        }

        if self.credentials.is_empty() {
            tracing::warn!("No API credentials configured; the pool will start empty");
        }

        Ok(())
    }

    /// Build a pool from the configured credentials, in configuration order
    pub fn api_pool(&self) -> ApiPool<ApiKeyCredential> {
        let creds: Vec<ApiKeyCredential> = self
            .credentials
            .iter()
            .cloned()
            .map(ApiKeyCredential::from)
            .collect();
        ApiPool::from(creds)
    }
}

/// Read credentials from `API_CREDENTIALS` (JSON array) or `API_KEYS`
/// (comma-separated keys, named `key-0`, `key-1`, ...).
fn load_credentials<F>(lookup: &F) -> Result<Vec<ApiKeyCredentialConfig>, ApiError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(json) = lookup("API_CREDENTIALS") {
        return serde_json::from_str(&json)
            .map_err(|e| ApiError::Config(format!("invalid API_CREDENTIALS: {}", e)));
    }

    let Some(keys) = lookup("API_KEYS") else {
        return Ok(Vec::new());
    };

    Ok(keys
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .enumerate()
        .map(|(i, key)| ApiKeyCredentialConfig {
            api_key: key.to_string(),
            name: format!("key-{}", i),
            base_url: None,
        })
        .collect())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ApiError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ApiError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ApiError::Config(format!("invalid {} value {:?}: {}", key, raw, e))),
    }
}
