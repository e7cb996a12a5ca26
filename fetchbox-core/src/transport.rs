//! Network transport seam.
//!
//! The coordinator never talks to the network itself. It goes through a
//! [`Transport`], a single async call that takes a [`RequestDescriptor`] and
//! returns the raw status, headers and body. `fetchbox-reqwest` provides
//! the production implementation; tests use in-memory fakes.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use fetchbox_core::{RequestDescriptor, Transport, TransportError, TransportResponse};
//! use http::{HeaderMap, StatusCode};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Transport for Echo {
//!     async fn fetch(
//!         &self,
//!         request: RequestDescriptor,
//!     ) -> Result<TransportResponse, TransportError> {
//!         Ok(TransportResponse {
//!             status: StatusCode::OK,
//!             headers: HeaderMap::new(),
//!             body: Bytes::from(request.url),
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::RequestDescriptor;

/// Raw response as returned by the network.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Fully read body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Network level failure.
///
/// Cloneable so a single failed call can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, reset, timed out or otherwise failed.
    #[error("connection error: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),
    /// The caller's cancellation signal fired before the call finished.
    #[error("request aborted")]
    Aborted,
    /// The descriptor could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Wraps any error as a connection failure.
    pub fn connection<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TransportError::Connection(Arc::new(error))
    }
}

/// Trait for performing the actual network call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and reads the whole response.
    async fn fetch(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn fetch(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn fetch(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        (**self).fetch(request).await
    }
}
