#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Cache settings, their resolution per call, and file-driven client
/// configuration.
pub mod config;

/// The request pipeline and the [`Fetch`] client.
pub mod client;

/// Decides between the store, an in-flight call and the network.
pub mod coordinator;

/// Error types for requests and configuration.
pub mod error;

/// Registry of network calls currently in flight, keyed by cache key.
pub mod inflight;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters for
/// hits, misses, joins and bypasses, plus a histogram of network call time.
pub mod metrics;

pub use client::{
    AfterFn, BeforeFn, ErrorFn, Fetch, FetchBuilder, Payload, RequestBody, RequestOptions,
};
pub use config::{
    CacheConfig, CacheOptions, CachePredicate, CacheSetting, FetchConfig, InstanceCache,
    KeyExtractor, MethodPredicate, MethodUrlKey, NeverCache, Output,
};
pub use coordinator::{Coordinator, Decision};
pub use error::{ConfigurationError, FetchError, ResponseError};
pub use inflight::{Claim, InFlightRegistry, SharedCall};

pub use fetchbox_backend::{Backend, BackendError, CacheBackend, MemoryBackend};
pub use fetchbox_core::{
    Body, CacheKey, CancellationToken, Expire, RequestDescriptor, Response, Transport,
    TransportError, TransportResponse, parse,
};
