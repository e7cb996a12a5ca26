//! Normalized outgoing request.
//!
//! A [`RequestDescriptor`] is what the client pipeline hands to the
//! coordinator once the URL, headers and body have been resolved. It is
//! used both to perform the network call and to derive the cache key.

use bytes::Bytes;
use http::{HeaderMap, Method};
use tokio_util::sync::CancellationToken;

/// Normalized `{ method, url, headers, body, signal }` request.
///
/// Header names in an [`HeaderMap`] are always lowercase, so merged
/// headers never differ by case alone.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL, query string included.
    pub url: String,
    /// Merged request headers.
    pub headers: HeaderMap,
    /// Already encoded request body.
    pub body: Option<Bytes>,
    /// Cancellation signal owned by the caller.
    ///
    /// A request carrying a signal is never deduplicated nor cached.
    pub signal: Option<CancellationToken>,
}

impl RequestDescriptor {
    /// Creates a descriptor without headers, body or signal.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            signal: None,
        }
    }

    /// Returns the lowercase method name (`"get"`, `"post"`, ...).
    pub fn normalized_method(&self) -> String {
        self.method.as_str().to_ascii_lowercase()
    }

    /// Returns `true` if the caller attached a cancellation signal.
    pub fn is_cancellable(&self) -> bool {
        self.signal.is_some()
    }

    /// Returns `true` once the attached signal has been triggered.
    pub fn is_cancelled(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_methods_are_lowercased() {
        let method = Method::from_bytes(b"PURGE").unwrap();
        let request = RequestDescriptor::new(method, "/");
        assert_eq!(request.normalized_method(), "purge");
    }

    #[test]
    fn reports_signal_state() {
        let mut request = RequestDescriptor::new(Method::GET, "/");
        assert!(!request.is_cancellable());

        let token = CancellationToken::new();
        request.signal = Some(token.clone());
        assert!(request.is_cancellable());
        assert!(!request.is_cancelled());

        token.cancel();
        assert!(request.is_cancelled());
    }
}
