//! API handle rotation and retry-with-failover helpers for API client SDKs

// Public modules
pub mod config;
pub mod error;
pub mod services;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ApiError, RetryError};
pub use services::{ApiBound, ApiKeyCredential, ApiPool, DefaultApiPool, PoolStats};
pub use utils::{RetryConfig, RetryResult, RetryWithBackoff};
pub use validation::warning;
