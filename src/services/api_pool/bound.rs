//! Capability traits for objects that carry an API handle

use super::pool::ApiPool;
use std::fmt;
use std::sync::Arc;

/// An object holding the API handle it uses for requests
///
/// `RetryWithBackoff` reads the handle after a failure, demotes it and
/// installs the pool's next handle through `set_api`.
pub trait ApiBound {
    type Handle: Clone + PartialEq + fmt::Debug;

    /// The handle currently in use
    fn api(&self) -> &Self::Handle;

    /// Replace the handle used for subsequent requests
    fn set_api(&mut self, api: Self::Handle);
}

/// Types that share one default pool across all instances
///
/// Implementors usually keep the pool in a `OnceLock` static so every
/// instance of the type rotates through the same handles, while other types
/// keep their own.
pub trait DefaultApiPool: ApiBound {
    fn default_api_pool() -> Arc<ApiPool<Self::Handle>>;
}
