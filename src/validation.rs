//! Validation notices for malformed API objects
//!
//! In strict mode a notice is a hard error; otherwise it is logged as a
//! warning and the caller carries on.

use crate::config::Settings;
use crate::error::ApiError;

/// Report a validation problem described by `message`
///
/// Returns `ApiError::BadObject` when `settings.strict_mode` is set, and
/// emits a `tracing` warning and returns `Ok(())` otherwise.
pub fn warning(settings: &Settings, message: &str) -> Result<(), ApiError> {
    if settings.strict_mode {
        return Err(ApiError::BadObject(message.to_string()));
    }
    tracing::warn!(target: "api_failover::validation", "{}", message);
    Ok(())
}
