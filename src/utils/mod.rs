//! Utility modules
//!
//! Contains retry logic with handle failover.

pub mod retry;

pub use retry::{RetryConfig, RetryResult, RetryWithBackoff, DEFAULT_BACKOFF, DEFAULT_DELAY};
