//! Error types for Redis store operations.
//!
//! Every error converts into [`BackendError`], so callers going through the
//! [`Backend`] trait only ever see the store-agnostic type.
//!
//! [`BackendError`]: fetchbox_backend::BackendError
//! [`Backend`]: fetchbox_backend::Backend

use fetchbox_backend::BackendError;
use redis::RedisError;

/// Error type for Redis store operations.
///
/// Shows up when [`RedisBackendBuilder::build`] is given an invalid
/// connection URL, when the server is unreachable on first use (the
/// connection is established lazily), or when a command fails.
///
/// [`RedisBackendBuilder::build`]: crate::RedisBackendBuilder::build
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the underlying Redis client.
    #[error("Redis backend error: {0}")]
    Redis(#[from] RedisError),
}

impl From<Error> for BackendError {
    fn from(error: Error) -> Self {
        match error {
            Error::Redis(error) if is_connection_error(&error) => {
                Self::ConnectionError(Box::new(error))
            }
            error => Self::InternalError(Box::new(error)),
        }
    }
}

fn is_connection_error(error: &RedisError) -> bool {
    error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
        || error.is_timeout()
}
