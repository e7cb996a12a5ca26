//! Decides, per request, between the cache store, an in-flight call and the
//! network.
//!
//! ```text
//!            eligible?
//!           /         \
//!         no           yes
//!          |            |
//!       Bypass    store.exists(key)?
//!                  /           \
//!               yes             no
//!                |               |
//!               Hit       in flight for key?
//!                           /          \
//!                        yes            no
//!                         |              |
//!                        Join           Lead ── success ──> store.set(key, ttl)
//! ```
//!
//! The shared call writes its response to the store before giving up its
//! in-flight entry, so a caller arriving in between finds one or the other.
//! The write happens even if the lead has gone and only joiners remain. A
//! failed call is never stored.
//!
//! `exists` is awaited before the in-flight lookup. With a store that
//! suspends on that call, two callers can both miss the store and the
//! registry and both lead. With the in-process store the window is closed,
//! because the memory store answers without yielding.

use fetchbox_backend::{Backend, BackendError, CacheBackend};
use fetchbox_core::{RequestDescriptor, Response};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::{
    FetchError,
    config::CacheConfig,
    inflight::{Claim, InFlightRegistry},
    metrics,
};

/// Path taken by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not eligible: plain network call, no store, no joining.
    Bypass,
    /// Served from the store.
    Hit,
    /// Awaited another caller's network call.
    Join,
    /// Made the network call and stored its result.
    Lead,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Bypass => "bypass",
            Decision::Hit => "hit",
            Decision::Join => "join",
            Decision::Lead => "lead",
        }
    }
}

/// Dedupe and cache coordinator owned by one client.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    inflight: InFlightRegistry,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of calls currently in flight.
    pub fn inflight(&self) -> &InFlightRegistry {
        &self.inflight
    }

    /// Resolves `request` through the store, the registry or `call`.
    pub async fn execute<F>(
        &self,
        request: &RequestDescriptor,
        config: &CacheConfig,
        call: F,
    ) -> Result<Response, FetchError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Response, FetchError>> + Send,
    {
        self.execute_traced(request, config, call)
            .await
            .map(|(response, _)| response)
    }

    /// Like [`execute`](Self::execute), also reporting the path taken.
    pub async fn execute_traced<F>(
        &self,
        request: &RequestDescriptor,
        config: &CacheConfig,
        call: F,
    ) -> Result<(Response, Decision), FetchError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Response, FetchError>> + Send,
    {
        let backend = config.store.name();

        if !config.is_eligible(request) {
            debug!(method = %request.method, url = %request.url, "Cache bypass");
            metrics::record_decision(Decision::Bypass, backend);
            return call().await.map(|response| (response, Decision::Bypass));
        }

        let key = config.key(request);

        if config.store.exists(&key).await? {
            // The entry may expire between `exists` and `get`; fall through.
            match config.store.get::<Response>(&key).await {
                Ok(Some(response)) => {
                    debug!(%key, backend, "Cache hit");
                    metrics::record_decision(Decision::Hit, backend);
                    return Ok((response, Decision::Hit));
                }
                Ok(None) => {}
                Err(error @ BackendError::FormatError(_)) => {
                    // An undecodable entry would fail every call until it expires.
                    warn!(%key, backend, %error, "Removing undecodable cache entry");
                    if let Err(error) = config.store.delete(&key).await {
                        warn!(%key, backend, %error, "Failed to remove cache entry");
                    }
                    return Err(error.into());
                }
                Err(error) => return Err(error.into()),
            }
        }

        let store = config.store.clone();
        let ttl = config.ttl;
        let stored_key = key.clone();
        let claim = self.inflight.claim(key.clone(), move || {
            let call = call();
            async move {
                let response = call.await?;
                if let Err(error) = store.set(&stored_key, &response, ttl).await {
                    warn!(
                        key = %stored_key,
                        backend = store.name(),
                        %error,
                        "Failed to store response"
                    );
                    return Err(error.into());
                }
                Ok(response)
            }
            .boxed()
        });

        match claim {
            Claim::Join(shared) => {
                debug!(%key, "Joined in-flight call");
                metrics::record_decision(Decision::Join, backend);
                shared.await.map(|response| (response, Decision::Join))
            }
            Claim::Lead(shared) => {
                debug!(%key, ttl = config.ttl_seconds(), "Cache miss, leading network call");
                metrics::record_decision(Decision::Lead, backend);
                shared.await.map(|response| (response, Decision::Lead))
            }
        }
    }
}
