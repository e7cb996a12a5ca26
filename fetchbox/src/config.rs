//! Cache and client configuration.
//!
//! The `cache` option accepts four shapes at both the client and the call
//! level: a boolean, a number of seconds, a duration string, or a
//! [`CacheOptions`] object. [`CacheSetting`] holds either form and is
//! resolved once per call by [`InstanceCache::resolve`] into a
//! [`CacheConfig`], which is the only thing the coordinator looks at.
//!
//! ```
//! use fetchbox::config::{CacheSetting, InstanceCache};
//! use fetchbox_core::RequestDescriptor;
//! use http::Method;
//!
//! let instance = InstanceCache::new(Some(CacheSetting::from("1h")));
//!
//! let config = instance.resolve(None);
//! assert_eq!(config.ttl_seconds(), 3600);
//!
//! // A per-call `false` turns caching off for that call only.
//! let config = instance.resolve(Some(&CacheSetting::from(false)));
//! assert!(!config.is_eligible(&RequestDescriptor::new(Method::GET, "/users")));
//! ```

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use fetchbox_backend::{Backend, BackendResult, MemoryBackend};
use fetchbox_core::{CacheKey, Expire, RequestDescriptor};
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::ConfigurationError;

/// Decides whether a request may be served from and written to the cache.
pub trait CachePredicate: Send + Sync {
    /// Returns `true` if the request is cacheable.
    fn should_cache(&self, request: &RequestDescriptor) -> bool;
}

impl<F> CachePredicate for F
where
    F: Fn(&RequestDescriptor) -> bool + Send + Sync,
{
    fn should_cache(&self, request: &RequestDescriptor) -> bool {
        self(request)
    }
}

/// Derives the cache key for a request.
pub trait KeyExtractor: Send + Sync {
    /// Returns the key used for both the store and in-flight joining.
    fn create_key(&self, request: &RequestDescriptor) -> CacheKey;
}

impl<F> KeyExtractor for F
where
    F: Fn(&RequestDescriptor) -> CacheKey + Send + Sync,
{
    fn create_key(&self, request: &RequestDescriptor) -> CacheKey {
        self(request)
    }
}

/// Caches requests whose method is in a fixed set. Defaults to `GET` only.
#[derive(Debug, Clone)]
pub struct MethodPredicate {
    methods: Vec<Method>,
}

impl MethodPredicate {
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }
}

impl Default for MethodPredicate {
    fn default() -> Self {
        Self::new([Method::GET])
    }
}

impl CachePredicate for MethodPredicate {
    fn should_cache(&self, request: &RequestDescriptor) -> bool {
        self.methods.contains(&request.method)
    }
}

/// Never caches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCache;

impl CachePredicate for NeverCache {
    fn should_cache(&self, _request: &RequestDescriptor) -> bool {
        false
    }
}

/// Default key: `"<lowercase method>:<resolved url>"`.
///
/// Requests that differ only in headers or body share a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodUrlKey;

impl KeyExtractor for MethodUrlKey {
    fn create_key(&self, request: &RequestDescriptor) -> CacheKey {
        CacheKey::from_request(request)
    }
}

/// Object form of the `cache` option.
///
/// Every field is optional; unset fields fall back to the client's.
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Lifetime of stored responses.
    pub expire: Option<Expire>,
    /// Store used instead of the client's.
    pub store: Option<Arc<dyn Backend>>,
    /// Cacheability predicate used instead of the client's.
    pub should_cache: Option<Arc<dyn CachePredicate>>,
    /// Key derivation used instead of the client's.
    pub create_key: Option<Arc<dyn KeyExtractor>>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire(mut self, expire: impl Into<Expire>) -> Self {
        self.expire = Some(expire.into());
        self
    }

    pub fn store(mut self, store: impl Backend + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Uses an already shared store, so several clients can point at it.
    pub fn shared_store(mut self, store: Arc<dyn Backend>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn should_cache(mut self, predicate: impl CachePredicate + 'static) -> Self {
        self.should_cache = Some(Arc::new(predicate));
        self
    }

    pub fn create_key(mut self, extractor: impl KeyExtractor + 'static) -> Self {
        self.create_key = Some(Arc::new(extractor));
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("expire", &self.expire)
            .field("store", &self.store.as_ref().map(|store| store.name()))
            .field("should_cache", &self.should_cache.is_some())
            .field("create_key", &self.create_key.is_some())
            .finish()
    }
}

impl<'de> Deserialize<'de> for CacheOptions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Stores and callbacks are code, so only `expire` can come from a file.
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Repr {
            #[serde(default)]
            expire: Option<Expire>,
        }

        let repr = Repr::deserialize(deserializer)?;
        Ok(CacheOptions {
            expire: repr.expire,
            ..CacheOptions::default()
        })
    }
}

/// The `cache` option: a scalar lifetime or an options object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    /// `true`, `false`, a number of seconds or a duration string.
    Expire(Expire),
    /// `{ expire, store, should_cache, create_key }`.
    Options(CacheOptions),
}

impl CacheSetting {
    /// The `expire` value carried by either shape.
    pub fn expire(&self) -> Option<&Expire> {
        match self {
            CacheSetting::Expire(expire) => Some(expire),
            CacheSetting::Options(options) => options.expire.as_ref(),
        }
    }

    fn options(&self) -> Option<&CacheOptions> {
        match self {
            CacheSetting::Expire(_) => None,
            CacheSetting::Options(options) => Some(options),
        }
    }
}

impl From<CacheOptions> for CacheSetting {
    fn from(options: CacheOptions) -> Self {
        CacheSetting::Options(options)
    }
}

macro_rules! expire_setting {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CacheSetting {
                fn from(value: $ty) -> Self {
                    CacheSetting::Expire(Expire::from(value))
                }
            }
        )*
    };
}

expire_setting!(Expire, bool, f64, u64, u32, i64, i32, &str, String, Duration);

/// Cache state owned by one client instance.
#[derive(Clone)]
pub struct InstanceCache {
    store: Arc<dyn Backend>,
    should_cache: Arc<dyn CachePredicate>,
    create_key: Arc<dyn KeyExtractor>,
    expire: Option<Expire>,
}

impl InstanceCache {
    /// Builds the instance cache from the client's `cache` option.
    ///
    /// A fresh [`MemoryBackend`] is created when no store is given, so two
    /// clients never share entries by accident. An explicit `false` or `0`
    /// lifetime makes the client never cache, which a per-call lifetime
    /// alone cannot undo.
    pub fn new(setting: Option<CacheSetting>) -> Self {
        let disabled = setting
            .as_ref()
            .and_then(CacheSetting::expire)
            .is_some_and(is_explicitly_off);
        let options = match setting {
            Some(CacheSetting::Options(options)) => options,
            Some(CacheSetting::Expire(expire)) => CacheOptions::new().expire(expire),
            None => CacheOptions::new(),
        };

        let should_cache = if disabled {
            Arc::new(NeverCache) as Arc<dyn CachePredicate>
        } else {
            options
                .should_cache
                .unwrap_or_else(|| Arc::new(MethodPredicate::default()))
        };

        Self {
            store: options
                .store
                .unwrap_or_else(|| Arc::new(MemoryBackend::new())),
            should_cache,
            create_key: options.create_key.unwrap_or_else(|| Arc::new(MethodUrlKey)),
            expire: options.expire,
        }
    }

    /// The store used when a call does not bring its own.
    pub fn store(&self) -> &Arc<dyn Backend> {
        &self.store
    }

    /// Removes every entry from the instance store.
    pub async fn clear(&self) -> BackendResult<()> {
        self.store.flush_all().await
    }

    /// Merges a per-call setting over the instance one.
    ///
    /// Lifetime precedence is per-call nested `expire`, then per-call scalar,
    /// then the instance lifetime. Per-call `store`, `should_cache` and
    /// `create_key` replace the instance ones.
    pub fn resolve(&self, per_call: Option<&CacheSetting>) -> CacheConfig {
        let options = per_call.and_then(CacheSetting::options);
        let expire = per_call
            .and_then(CacheSetting::expire)
            .or(self.expire.as_ref());

        CacheConfig {
            store: options
                .and_then(|options| options.store.clone())
                .unwrap_or_else(|| self.store.clone()),
            should_cache: options
                .and_then(|options| options.should_cache.clone())
                .unwrap_or_else(|| self.should_cache.clone()),
            create_key: options
                .and_then(|options| options.create_key.clone())
                .unwrap_or_else(|| self.create_key.clone()),
            ttl: Duration::from_secs(expire.map_or(0, Expire::seconds)),
        }
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("store", &self.store.name())
            .field("expire", &self.expire)
            .finish_non_exhaustive()
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::new(None)
    }
}

fn is_explicitly_off(expire: &Expire) -> bool {
    match expire {
        Expire::Flag(flag) => !flag,
        Expire::Seconds(seconds) => *seconds == 0.0,
        Expire::Text(_) => false,
    }
}

/// Fully resolved cache configuration for one call.
#[derive(Clone)]
pub struct CacheConfig {
    /// Store to read from and write to.
    pub store: Arc<dyn Backend>,
    /// Cacheability predicate.
    pub should_cache: Arc<dyn CachePredicate>,
    /// Key derivation.
    pub create_key: Arc<dyn KeyExtractor>,
    /// Lifetime of the stored response, zero disables caching.
    pub ttl: Duration,
}

impl CacheConfig {
    /// Whole seconds the response would be stored for.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Returns `true` if the request may use the store and join in-flight calls.
    ///
    /// A request carrying a cancellation signal always owns its network call.
    pub fn is_eligible(&self, request: &RequestDescriptor) -> bool {
        !request.is_cancellable() && !self.ttl.is_zero() && self.should_cache.should_cache(request)
    }

    /// Derives the key for the request.
    pub fn key(&self, request: &RequestDescriptor) -> CacheKey {
        self.create_key.create_key(request)
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// What a call returns once the response is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    /// The decoded body: JSON, text or bytes depending on the content type.
    #[default]
    Body,
    /// The whole normalized response.
    Response,
    /// The body as text.
    Text,
    /// The body parsed as JSON regardless of content type.
    Json,
    /// The raw body bytes.
    Bytes,
}

impl FromStr for Output {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(Output::Body),
            "response" => Ok(Output::Response),
            "text" => Ok(Output::Text),
            "json" => Ok(Output::Json),
            "bytes" | "arrayBuffer" | "blob" => Ok(Output::Bytes),
            other => Err(ConfigurationError::InvalidOutput(other.to_owned())),
        }
    }
}

/// Client configuration that can be loaded from a file.
///
/// ```
/// use fetchbox::FetchConfig;
///
/// let config: FetchConfig = serde_json::from_str(r#"{
///     "baseURL": "https://api.example.com/",
///     "headers": { "Authorization": "Bearer token" },
///     "cache": "5 minutes"
/// }"#).unwrap();
///
/// assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Base every relative request URL is joined onto.
    #[serde(alias = "baseURL", alias = "baseUrl")]
    pub base_url: Option<String>,
    /// Default method, `GET` when unset.
    pub method: Option<String>,
    /// Default headers, sent with every request.
    pub headers: IndexMap<String, String>,
    /// Default query parameters. `null` values are dropped.
    pub query: IndexMap<String, serde_json::Value>,
    /// Default `cache` option.
    pub cache: Option<CacheSetting>,
    /// Default output name, see [`Output`].
    pub output: Option<String>,
}

impl FetchConfig {
    /// Query parameters as strings, `None` for values that are dropped.
    pub fn query_pairs(&self) -> impl Iterator<Item = (String, Option<String>)> + '_ {
        self.query.iter().map(|(name, value)| {
            let value = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            };
            (name.clone(), value)
        })
    }
}
