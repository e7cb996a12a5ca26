//! Cache key type.
//!
//! Every logical request that is eligible for caching is identified by a
//! [`CacheKey`]. Two requests with the same key share one in-flight network
//! call and one stored entry.
//!
//! ## Format
//!
//! The default key is `{method}:{url}` where the method is lowercase and
//! the url is fully resolved, query string included:
//!
//! ```
//! use fetchbox_core::{CacheKey, RequestDescriptor};
//! use http::Method;
//!
//! let request = RequestDescriptor::new(Method::GET, "https://api.example.com/users?page=2");
//! let key = CacheKey::from_request(&request);
//! assert_eq!(key.as_str(), "get:https://api.example.com/users?page=2");
//! ```
//!
//! Headers do not take part in the default key, so two requests that only
//! differ by header values collide. Supply a custom key extractor when that
//! matters.
//!
//! ## Performance
//!
//! [`CacheKey`] wraps a [`SmolStr`], so short keys (≤23 bytes) are stored
//! inline and cloning a long key only bumps a reference count.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::RequestDescriptor;

/// A cache key identifying a cached entry and its in-flight call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl AsRef<str>) -> Self {
        CacheKey(SmolStr::new(key))
    }

    /// Builds the default `{method}:{url}` key for a request.
    pub fn from_request(request: &RequestDescriptor) -> Self {
        CacheKey(smol_str::format_smolstr!(
            "{}:{}",
            request.normalized_method(),
            request.url
        ))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the length of the key in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty key.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey(SmolStr::from(key))
    }
}

impl From<SmolStr> for CacheKey {
    fn from(key: SmolStr) -> Self {
        CacheKey(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};

    #[test]
    fn default_key_lowercases_method() {
        let request = RequestDescriptor::new(Method::POST, "/submit");
        assert_eq!(CacheKey::from_request(&request).as_str(), "post:/submit");
    }

    #[test]
    fn headers_do_not_change_default_key() {
        let plain = RequestDescriptor::new(Method::GET, "/data");
        let mut with_header = RequestDescriptor::new(Method::GET, "/data");
        with_header
            .headers
            .insert("authorization", HeaderValue::from_static("Bearer a"));

        assert_eq!(
            CacheKey::from_request(&plain),
            CacheKey::from_request(&with_header)
        );
    }

    #[test]
    fn query_string_is_part_of_default_key() {
        let first = RequestDescriptor::new(Method::GET, "/data?page=1");
        let second = RequestDescriptor::new(Method::GET, "/data?page=2");
        assert_ne!(CacheKey::from_request(&first), CacheKey::from_request(&second));
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = CacheKey::new("get:/a");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"get:/a\"");
    }
}
