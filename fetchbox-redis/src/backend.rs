//! Redis store implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use fetchbox_backend::{Backend, BackendError, BackendResult, DeleteStatus};
use fetchbox_core::{CacheKey, Raw};
use redis::{Client, aio::ConnectionManager};
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// Redis store based on redis-rs crate.
///
/// This struct provides Redis as a storage [`Backend`] for fetchbox.
/// It uses a [`ConnectionManager`] for asynchronous network interaction.
///
/// [`ConnectionManager`]: redis::aio::ConnectionManager
/// [`Backend`]: fetchbox_backend::Backend
#[derive(Clone)]
pub struct RedisBackend {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    prefix: String,
    name: String,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisBackend {
    /// Create new backend instance with default settings.
    ///
    /// # Examples
    /// ```
    /// use fetchbox_redis::RedisBackend;
    ///
    /// let backend = RedisBackend::new();
    /// ```
    pub fn new() -> Result<Self, BackendError> {
        Ok(Self::builder().build()?)
    }

    /// Creates new RedisBackend builder with default settings.
    #[must_use]
    pub fn builder() -> RedisBackendBuilder {
        RedisBackendBuilder::default()
    }

    /// Create lazy connection to redis via [`ConnectionManager`]
    pub async fn connection(&self) -> Result<&ConnectionManager, BackendError> {
        trace!("Get connection manager");
        let manager = self
            .connection
            .get_or_try_init(|| {
                trace!("Initialize new redis connection manager");
                self.client.get_connection_manager()
            })
            .await
            .map_err(Error::from)?;
        Ok(manager)
    }

    /// Namespace prepended to every key, empty by default.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn prefixed(&self, key: &CacheKey) -> String {
        prefixed(&self.prefix, key)
    }
}

fn prefixed(prefix: &str, key: &CacheKey) -> String {
    format!("{prefix}{key}")
}

fn strip_prefix(prefix: &str, key: &str) -> Option<CacheKey> {
    key.strip_prefix(prefix).map(CacheKey::from)
}

/// Glob pattern matching every key under `prefix`, with glob
/// metacharacters in the prefix escaped.
fn key_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

/// Part of builder pattern implementation for RedisBackend.
pub struct RedisBackendBuilder {
    connection_info: String,
    prefix: String,
    name: String,
}

impl Default for RedisBackendBuilder {
    fn default() -> Self {
        Self {
            connection_info: "redis://127.0.0.1/".to_owned(),
            prefix: String::new(),
            name: "redis".to_owned(),
        }
    }
}

impl RedisBackendBuilder {
    /// Set connection info (host, port, database, etc.) for RedisBackend.
    pub fn server(mut self, connection_info: impl Into<String>) -> Self {
        self.connection_info = connection_info.into();
        self
    }

    /// Namespace all keys with `prefix`.
    ///
    /// With a prefix set, [`Backend::flush_all`] only removes keys under it
    /// instead of flushing the whole database.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set a custom name for this backend, used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create new instance of Redis backend with passed settings.
    pub fn build(self) -> Result<RedisBackend, Error> {
        Ok(RedisBackend {
            client: Client::open(self.connection_info)?,
            connection: OnceCell::new(),
            prefix: self.prefix,
            name: self.name,
        })
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let mut con = self.connection().await?.clone();
        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.prefixed(key))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(data.map(Bytes::from))
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        let ttl = ttl.as_secs();
        if ttl == 0 {
            return Ok(());
        }
        let mut con = self.connection().await?.clone();
        redis::cmd("SET")
            .arg(self.prefixed(key))
            .arg(value.as_ref())
            .arg("EX")
            .arg(ttl)
            .query_async::<()>(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        let mut con = self.connection().await?.clone();
        let found: i64 = redis::cmd("EXISTS")
            .arg(self.prefixed(key))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(found > 0)
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        let mut con = self.connection().await?.clone();
        let deleted: u32 = redis::cmd("DEL")
            .arg(self.prefixed(key))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            Ok(DeleteStatus::Deleted(deleted))
        } else {
            Ok(DeleteStatus::Missing)
        }
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        let mut con = self.connection().await?.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(key_pattern(&self.prefix))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(keys
            .iter()
            .filter_map(|key| strip_prefix(&self.prefix, key))
            .collect())
    }

    async fn flush_all(&self) -> BackendResult<()> {
        let mut con = self.connection().await?.clone();
        if self.prefix.is_empty() {
            trace!(backend = %self.name, "FLUSHDB");
            redis::cmd("FLUSHDB")
                .query_async::<()>(&mut con)
                .await
                .map_err(Error::from)?;
            return Ok(());
        }

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(key_pattern(&self.prefix))
            .query_async(&mut con)
            .await
            .map_err(Error::from)?;
        trace!(backend = %self.name, count = keys.len(), "Deleting prefixed keys");
        if keys.is_empty() {
            return Ok(());
        }
        redis::cmd("DEL")
            .arg(keys)
            .query_async::<()>(&mut con)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
