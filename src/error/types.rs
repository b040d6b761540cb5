//! Error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bad object: {0}")]
    BadObject(String),

    #[error("API pool exhausted: no active or awaiting handles")]
    PoolExhausted,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error returned by a call wrapped in `RetryWithBackoff`
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The operation failed with an error that is not retried
    /// (or the attempt limit was reached)
    #[error("{0}")]
    Operation(E),

    /// The pool could not supply a replacement handle
    #[error(transparent)]
    Pool(#[from] ApiError),
}

impl<E> RetryError<E> {
    /// Return the operation error, if this is one
    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(err) => Some(err),
            RetryError::Pool(_) => None,
        }
    }
}
