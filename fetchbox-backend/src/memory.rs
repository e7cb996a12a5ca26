//! In-process store.
//!
//! Entries live in a concurrent map together with the time they were written.
//! Expiry is lazy: an expired entry stays in the map, and is still listed by
//! [`Backend::keys`], until it is read, overwritten, removed or purged.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use fetchbox_core::{CacheKey, Raw};
use tracing::trace;

use crate::{Backend, BackendResult, DeleteStatus};

#[derive(Debug, Clone)]
struct StoredEntry {
    data: Raw,
    stored_at: DateTime<Utc>,
    ttl: Duration,
    seq: u64,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = (now - self.stored_at).num_milliseconds();
        let ttl = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        age > ttl
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: DashMap<CacheKey, StoredEntry>,
    seq: AtomicU64,
}

/// Store backed by a process-local concurrent map.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.inner.entries.len());
        trace!(purged, "Expired entries purged");
        purged
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let now = Utc::now();
        match self.inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.data.clone())),
            Some(_) => {}
        }
        // Re-checked under the shard lock so a concurrent overwrite survives.
        self.inner
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now));
        trace!(%key, "Expired entry evicted on read");
        Ok(None)
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        let stored_at = Utc::now();
        match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let seq = occupied.get().seq;
                occupied.insert(StoredEntry {
                    data: value,
                    stored_at,
                    ttl,
                    seq,
                });
            }
            Entry::Vacant(vacant) => {
                let seq = self.next_seq();
                vacant.insert(StoredEntry {
                    data: value,
                    stored_at,
                    ttl,
                    seq,
                });
            }
        }
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        match self.inner.entries.remove(key) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        let mut keys: Vec<(u64, CacheKey)> = self
            .inner
            .entries
            .iter()
            .map(|entry| (entry.value().seq, entry.key().clone()))
            .collect();
        keys.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(keys.into_iter().map(|(_, key)| key).collect())
    }

    async fn flush_all(&self) -> BackendResult<()> {
        self.inner.entries.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let stored_at = Utc::now();
        let entry = StoredEntry {
            data: Raw::from_static(b"x"),
            stored_at,
            ttl: Duration::from_secs(1),
            seq: 0,
        };
        assert!(!entry.is_expired(stored_at + chrono::Duration::milliseconds(1000)));
        assert!(entry.is_expired(stored_at + chrono::Duration::milliseconds(1001)));
    }
}
