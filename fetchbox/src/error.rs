//! Error types for requests issued through [`Fetch`](crate::Fetch).

use std::sync::Arc;

use fetchbox_backend::BackendError;
use fetchbox_core::{Response, TransportError};
use thiserror::Error;

/// Every way a request can fail.
///
/// Cloneable so the outcome of one network call can be handed to every
/// caller that joined it.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The transport could not complete the call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Client or call options are invalid. Raised before any network activity.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The cache store failed.
    #[error("cache store error: {0}")]
    Backend(Arc<BackendError>),

    /// The response body could not be decoded.
    #[error("cannot decode response body: {0}")]
    Decode(Arc<serde_json::Error>),
}

impl FetchError {
    /// Returns the error response for [`FetchError::Response`].
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchError::Response(error) => Some(&error.response),
            _ => None,
        }
    }

    /// Returns the status of the error response, if any.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|response| response.status)
    }

    /// Returns `true` if the caller's cancellation signal aborted the call.
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Transport(TransportError::Aborted))
    }
}

impl From<BackendError> for FetchError {
    fn from(error: BackendError) -> Self {
        FetchError::Backend(Arc::new(error))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Decode(Arc::new(error))
    }
}

/// Non-success status code, with the normalized response as context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Error {}", response.status)]
pub struct ResponseError {
    /// Status, headers and parsed body of the failed response.
    pub response: Response,
}

impl ResponseError {
    /// Wraps a failed response.
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

/// Invalid client or call configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Unknown `output` name.
    #[error("Invalid option output=\"{0}\"")]
    InvalidOutput(String),

    /// Method name that is not a valid HTTP token.
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    /// Base URL that does not parse as an absolute URL.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Request URL that cannot be joined onto the base URL.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Header name or value that is not valid HTTP.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// Request body that cannot be serialized.
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    /// [`FetchBuilder::build`](crate::FetchBuilder::build) was called without a transport.
    #[error("no transport configured, call .transport() before .build()")]
    MissingTransport,
}
