#![warn(missing_docs)]
//! # fetchbox-core
//!
//! Core traits and types for the fetchbox deduplicating HTTP client.
//!
//! This crate holds the vocabulary the other crates speak:
//!
//! - **Identify** a logical request ([`CacheKey`], [`RequestDescriptor`])
//! - **Decide** how long it stays cached ([`Expire`], [`parse`])
//! - **Represent** what came back ([`Response`], [`Body`])
//! - **Call** the network ([`Transport`])
//!
//! Stores live in `fetchbox-backend`, the coordinator and the client in
//! `fetchbox`.

pub mod expire;
pub mod key;
pub mod request;
pub mod response;
pub mod transport;

pub use expire::{DEFAULT_EXPIRE_SECONDS, Expire, parse};
pub use key::CacheKey;
pub use request::RequestDescriptor;
pub use response::{Body, Response};
pub use transport::{Transport, TransportError, TransportResponse};

#[doc(hidden)]
pub use smol_str::SmolStr;
#[doc(no_inline)]
pub use tokio_util::sync::CancellationToken;

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
