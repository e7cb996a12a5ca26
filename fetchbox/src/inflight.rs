//! Registry of network calls currently in flight.
//!
//! Each eligible key maps to one [`SharedCall`], a future every interested
//! caller can await. The first caller for a key becomes the lead and creates
//! the call; later callers join and await the same call, so success or
//! failure reaches all of them identically.
//!
//! The entry belongs to the call, not to the lead. It is released when the
//! call completes, before any waiter sees the result, or when every waiter
//! has gone and the call itself is dropped. A lead dropped mid-flight leaves
//! the entry in place for the joiners still driving the call.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use fetchbox_core::{CacheKey, Response};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::trace;

use crate::FetchError;

/// Network call shared between the lead and every joiner.
pub type SharedCall = Shared<BoxFuture<'static, Result<Response, FetchError>>>;

type WeakCall = WeakShared<BoxFuture<'static, Result<Response, FetchError>>>;

/// Outcome of [`InFlightRegistry::claim`].
pub enum Claim {
    /// No call was in flight; this caller started one.
    Lead(SharedCall),
    /// Another caller's call is in flight.
    Join(SharedCall),
}

impl Claim {
    /// Returns `true` for [`Claim::Lead`].
    pub fn is_lead(&self) -> bool {
        matches!(self, Claim::Lead(_))
    }
}

struct Slot {
    id: u64,
    call: WeakCall,
}

/// Per-client in-flight registry.
///
/// The map only holds weak handles, so a call nobody awaits anymore is
/// dropped and its entry released. Clones share the same map.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    calls: Arc<DashMap<CacheKey, Slot>>,
    next_id: Arc<AtomicU64>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the call in flight for `key`, or registers a new one built by
    /// `make_call`.
    ///
    /// Lookup and registration happen under one shard lock, so two callers
    /// can never both lead the same key. `make_call` only runs for the lead
    /// and must not touch this registry. Everything the returned future does,
    /// a store write included, happens before the entry is released.
    pub fn claim<F>(&self, key: CacheKey, make_call: F) -> Claim
    where
        F: FnOnce() -> BoxFuture<'static, Result<Response, FetchError>>,
    {
        match self.calls.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if let Some(call) = entry.get().call.upgrade() {
                    trace!(%key, "Joining in-flight call");
                    return Claim::Join(call);
                }
                // Every waiter is gone and the call is being dropped.
                let (slot, call) = self.register(key.clone(), make_call);
                if let Some(slot) = slot {
                    entry.insert(slot);
                }
                trace!(%key, "Replaced abandoned in-flight call");
                Claim::Lead(call)
            }
            Entry::Vacant(entry) => {
                let (slot, call) = self.register(key.clone(), make_call);
                if let Some(slot) = slot {
                    entry.insert(slot);
                }
                trace!(%key, "Registered in-flight call");
                Claim::Lead(call)
            }
        }
    }

    fn register<F>(&self, key: CacheKey, make_call: F) -> (Option<Slot>, SharedCall)
    where
        F: FnOnce() -> BoxFuture<'static, Result<Response, FetchError>>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = CallGuard {
            calls: self.calls.clone(),
            key,
            id,
        };
        let call = make_call();
        let call = async move {
            let result = call.await;
            drop(guard);
            result
        }
        .boxed()
        .shared();
        let slot = call.downgrade().map(|call| Slot { id, call });
        (slot, call)
    }

    /// Number of calls in flight.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Returns `true` if a call for `key` is in flight.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.calls.contains_key(key)
    }
}

impl std::fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("in_flight", &self.calls.len())
            .finish()
    }
}

/// Owned by the call future; removes its own entry when dropped.
struct CallGuard {
    calls: Arc<DashMap<CacheKey, Slot>>,
    key: CacheKey,
    id: u64,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        // A newer call may have replaced an abandoned one under the same key.
        if self
            .calls
            .remove_if(&self.key, |_, slot| slot.id == self.id)
            .is_some()
        {
            trace!(key = %self.key, "Released in-flight call");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use fetchbox_core::TransportError;
    use http::StatusCode;

    fn ok(body: &'static str) -> BoxFuture<'static, Result<Response, FetchError>> {
        async move { Ok(Response::new(StatusCode::OK, body)) }.boxed()
    }

    fn call(claim: Claim) -> SharedCall {
        match claim {
            Claim::Lead(call) | Claim::Join(call) => call,
        }
    }

    #[test]
    fn first_claim_leads_and_second_joins() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/a");
        let made = AtomicUsize::new(0);

        let lead = registry.claim(key.clone(), || {
            made.fetch_add(1, Ordering::SeqCst);
            ok("a")
        });
        let join = registry.claim(key.clone(), || {
            made.fetch_add(1, Ordering::SeqCst);
            ok("b")
        });

        assert!(lead.is_lead());
        assert!(!join.is_lead());
        assert_eq!(made.load(Ordering::SeqCst), 1);
        assert!(registry.contains(&key));
    }

    #[tokio::test]
    async fn completed_call_releases_entry() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/a");

        let response = call(registry.claim(key.clone(), || ok("a"))).await.unwrap();
        assert_eq!(response.body, fetchbox_core::Body::Text("a".to_owned()));
        assert!(registry.is_empty());
        assert!(registry.claim(key, || ok("again")).is_lead());
    }

    #[test]
    fn dropping_every_waiter_releases_entry() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/a");

        let lead = call(registry.claim(key.clone(), || ok("a")));
        let join = call(registry.claim(key.clone(), || ok("b")));
        drop(lead);
        assert!(registry.contains(&key));

        drop(join);
        assert!(registry.is_empty());
    }

    #[test]
    fn distinct_keys_do_not_interact() {
        let registry = InFlightRegistry::new();
        let a = registry.claim(CacheKey::from("get:/a"), || ok("a"));
        let b = registry.claim(CacheKey::from("get:/b"), || ok("b"));
        assert!(a.is_lead());
        assert!(b.is_lead());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn joiners_see_the_lead_outcome() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/fail");

        let lead = call(registry.claim(key.clone(), || {
            async { Err(FetchError::from(TransportError::Aborted)) }.boxed()
        }));
        let Claim::Join(join) = registry.claim(key, || ok("unused")) else {
            panic!("expected join");
        };

        let (lead, join) = tokio::join!(lead, join);

        assert!(lead.unwrap_err().is_aborted());
        assert!(join.unwrap_err().is_aborted());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn joiner_keeps_entry_after_lead_is_dropped() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/slow");

        let lead = registry.claim(key.clone(), || {
            async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(Response::new(StatusCode::OK, "done"))
            }
            .boxed()
        });
        let Claim::Join(join) = registry.claim(key.clone(), || ok("unused")) else {
            panic!("expected join");
        };

        drop(lead);
        assert!(registry.contains(&key));
        assert!(!registry.claim(key, || ok("unused")).is_lead());

        let response = join.await.unwrap();
        assert_eq!(response.body, fetchbox_core::Body::Text("done".to_owned()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn failure_seen_by_a_joiner_is_not_joined_later() {
        let registry = InFlightRegistry::new();
        let key = CacheKey::from("get:/fail");
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let mut lead = call(registry.claim(key.clone(), move || {
            async move {
                let _ = gate.await;
                Err(FetchError::from(TransportError::Aborted))
            }
            .boxed()
        }));
        let Claim::Join(join) = registry.claim(key.clone(), || ok("unused")) else {
            panic!("expected join");
        };

        assert!((&mut lead).now_or_never().is_none());
        release.send(()).unwrap();
        assert!(join.await.unwrap_err().is_aborted());

        // The lead has not been polled since, yet the entry is gone.
        assert!(!registry.contains(&key));
        assert!(registry.claim(key, || ok("fresh")).is_lead());
        drop(lead);
    }
}
