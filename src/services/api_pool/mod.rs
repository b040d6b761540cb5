//! API Pool Module
//!
//! Rotation of API handles with simple failover: a failing handle is moved to
//! the back of an awaiting queue, and the awaiting queue becomes the active
//! rotation again once the active handles are used up.
//!
//! # Example
//! ```
//! use api_failover::{ApiKeyCredential, ApiPool};
//!
//! # fn main() -> Result<(), api_failover::ApiError> {
//! let creds = vec![
//!     ApiKeyCredential::new("key1", "primary"),
//!     ApiKeyCredential::new("key2", "backup"),
//! ];
//! let pool = ApiPool::new(&creds);
//!
//! let current = pool.get_current()?;
//! pool.demote(&current);
//! assert_eq!(pool.get_current()?.name(), "backup");
//! # Ok(())
//! # }
//! ```

mod bound;
mod credential;
mod pool;

pub use bound::{ApiBound, DefaultApiPool};
pub use credential::{ApiKeyCredential, ApiKeyCredentialConfig};
pub use pool::{ApiPool, PoolStats};
