//! Services module
//!
//! Contains the API handle pool shared by retrying callers.

pub mod api_pool;

pub use api_pool::{
    ApiBound, ApiKeyCredential, ApiKeyCredentialConfig, ApiPool, DefaultApiPool, PoolStats,
};
