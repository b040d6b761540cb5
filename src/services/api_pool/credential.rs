//! Credential handle types
//!
//! The pool itself treats handles as opaque values compared by equality.
//! `ApiKeyCredential` is the concrete handle used by the CLI and by
//! callers that only need a key and an optional endpoint override.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// API Key Credential
// ============================================================================

/// Simple API key credential
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyCredential {
    /// Credential name for identification
    name: String,
    /// The API key
    api_key: String,
    /// Optional base URL override
    base_url: Option<String>,
}

impl ApiKeyCredential {
    pub fn new(api_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Set base URL override
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

// Keys end up in retry and pool logs through `{:?}`; never print them.
impl fmt::Debug for ApiKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredential")
            .field("name", &self.name)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Display for ApiKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Configuration Structures (for deserialization)
// ============================================================================

/// Configuration for API key credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyCredentialConfig {
    pub api_key: String,
    #[serde(default = "default_name")]
    pub name: String,
    pub base_url: Option<String>,
}

fn default_name() -> String {
    "default".to_string()
}

impl From<ApiKeyCredentialConfig> for ApiKeyCredential {
    fn from(config: ApiKeyCredentialConfig) -> Self {
        let cred = ApiKeyCredential::new(config.api_key, config.name);
        match config.base_url {
            Some(url) => cred.with_base_url(url),
            None => cred,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_credential() {
        let cred = ApiKeyCredential::new("test-key", "primary");
        assert_eq!(cred.name(), "primary");
        assert_eq!(cred.api_key(), "test-key");
        assert_eq!(cred.base_url(), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let cred = ApiKeyCredential::new("sk-secret", "primary");
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("primary"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_equality_covers_all_fields() {
        let a = ApiKeyCredential::new("key", "primary");
        let b = ApiKeyCredential::new("key", "primary").with_base_url("https://graph.example.com");
        assert_ne!(a, b);
        assert_eq!(a, ApiKeyCredential::new("key", "primary"));
    }

    #[test]
    fn test_from_config() {
        let config: ApiKeyCredentialConfig =
            serde_json::from_str(r#"{"api_key": "k1", "base_url": "https://b.example.com"}"#)
                .unwrap();
        let cred = ApiKeyCredential::from(config);
        assert_eq!(cred.name(), "default");
        assert_eq!(cred.base_url(), Some("https://b.example.com"));
    }
}
