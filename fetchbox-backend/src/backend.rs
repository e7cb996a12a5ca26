use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use fetchbox_core::{CacheKey, Raw};
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::{
    BackendError, DeleteStatus,
    format::{Format, FormatExt, JsonFormat},
};

pub type BackendResult<T> = Result<T, BackendError>;

/// Raw key-value store contract.
///
/// Every operation is individually atomic. TTLs are whole seconds; a write
/// with a zero TTL must not persist anything. Stores may expire entries
/// lazily on read or enforce TTLs server-side.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Returns the stored bytes if the entry is present and not expired.
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()>;

    /// Returns `true` if [`read`](Self::read) would find the entry.
    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        Ok(self.read(key).await?.is_some())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    /// All currently known keys, expired or not.
    async fn keys(&self) -> BackendResult<Vec<CacheKey>>;

    /// Removes every entry unconditionally.
    async fn flush_all(&self) -> BackendResult<()>;

    /// Returns the name of this backend for logs.
    fn name(&self) -> &str {
        "backend"
    }

    fn value_format(&self) -> &dyn Format {
        &JsonFormat
    }
}

#[async_trait]
impl<T> Backend for &T
where
    T: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        (**self).exists(key).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        (**self).keys().await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        (**self).flush_all().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl<T> Backend for Box<T>
where
    T: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        (**self).exists(key).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        (**self).keys().await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        (**self).flush_all().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl<T> Backend for Arc<T>
where
    T: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        (**self).exists(key).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        (**self).keys().await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        (**self).flush_all().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

/// High-level store trait with typed operations.
///
/// This trait provides typed `get`, `set`, and `delete` operations that
/// handle serialization through [`Backend::value_format`]. It is implemented
/// for every [`Backend`].
pub trait CacheBackend: Backend {
    fn get<T>(&self, key: &CacheKey) -> impl Future<Output = BackendResult<Option<T>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let Some(raw) = self.read(key).await? else {
                trace!(backend = self.name(), %key, "Entry missing");
                return Ok(None);
            };
            let format = self.value_format();
            let value = format.deserialize::<T>(&raw)?;
            trace!(
                backend = self.name(),
                format = format.name(),
                %key,
                bytes = raw.len(),
                "Entry read"
            );
            Ok(Some(value))
        }
    }

    /// Serializes and stores `value`. A zero `ttl` stores nothing.
    fn set<T>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> impl Future<Output = BackendResult<()>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            if ttl.is_zero() {
                trace!(backend = self.name(), %key, "Zero ttl, entry not stored");
                return Ok(());
            }
            let format = self.value_format();
            let raw = format.serialize(value)?;
            trace!(
                backend = self.name(),
                format = format.name(),
                %key,
                bytes = raw.len(),
                ttl = ttl.as_secs(),
                "Entry write"
            );
            self.write(key, raw, ttl).await
        }
    }

    fn delete(&self, key: &CacheKey) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move { self.remove(key).await }
    }
}

impl<B> CacheBackend for B where B: Backend + ?Sized {}
