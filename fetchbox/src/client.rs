//! Request pipeline.
//!
//! [`Fetch`] turns a URL and [`RequestOptions`] into a [`RequestDescriptor`],
//! runs the `before` interceptor, resolves the cache settings and hands the
//! request to the [`Coordinator`]. The network call itself normalizes the
//! transport response, turns non-2xx statuses into [`ResponseError`] and
//! runs the `after` and `error` interceptors, so every caller sharing a call
//! also shares their result. The stored value is that final [`Response`];
//! each caller then projects it into its own [`Output`].

use std::{fmt, sync::Arc, time::Instant};

use bytes::Bytes;
use fetchbox_backend::Backend;
use fetchbox_core::{Body, CancellationToken, RequestDescriptor, Response, Transport};
use futures::future::{BoxFuture, FutureExt};
use http::{HeaderMap, HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::{Url, form_urlencoded};

use crate::{
    config::{CacheSetting, FetchConfig, InstanceCache, Output},
    coordinator::Coordinator,
    error::{ConfigurationError, FetchError, ResponseError},
    metrics,
};

/// Rewrites the request before it is keyed and sent.
pub type BeforeFn = Arc<dyn Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync>;
/// Rewrites a successful response before it is cached and returned.
pub type AfterFn = Arc<dyn Fn(Response) -> Response + Send + Sync>;
/// Sees every failure of the network call and may recover with a response.
pub type ErrorFn = Arc<dyn Fn(FetchError) -> Result<Response, FetchError> + Send + Sync>;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as JSON, with `content-type: application/json` unless set.
    Json(serde_json::Value),
    /// Sent as is.
    Text(String),
    /// Sent as is.
    Bytes(Bytes),
}

impl RequestBody {
    /// Serializes `value` into a JSON body.
    pub fn json<T>(value: &T) -> Result<Self, ConfigurationError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|error| ConfigurationError::InvalidBody(error.to_string()))
    }

    fn encode(&self) -> Result<Bytes, ConfigurationError> {
        match self {
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|error| ConfigurationError::InvalidBody(error.to_string())),
            RequestBody::Text(text) => Ok(Bytes::from(text.clone())),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_owned())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

/// Per-call options. Anything left unset falls back to the client's value.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    /// Merged over the client's query; `None` removes a client parameter.
    pub query: IndexMap<String, Option<String>>,
    /// Merged over the client's headers.
    pub headers: IndexMap<String, String>,
    pub body: Option<RequestBody>,
    pub cache: Option<CacheSetting>,
    pub output: Option<Output>,
    /// Cancellation signal. A request carrying one is never cached nor joined.
    pub signal: Option<CancellationToken>,
    pub base_url: Option<String>,
    pub before: Option<BeforeFn>,
    pub after: Option<AfterFn>,
    pub error: Option<ErrorFn>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    fn or_method(mut self, method: Method) -> Self {
        self.method.get_or_insert(method);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), Some(value.to_string()));
        self
    }

    /// Drops a query parameter set on the client for this call.
    pub fn without_query(mut self, name: impl Into<String>) -> Self {
        self.query.insert(name.into(), None);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn cache(mut self, cache: impl Into<CacheSetting>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn before<F>(mut self, before: F) -> Self
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(before));
        self
    }

    pub fn after<F>(mut self, after: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(after));
        self
    }

    pub fn error<F>(mut self, error: F) -> Self
    where
        F: Fn(FetchError) -> Result<Response, FetchError> + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(error));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("cache", &self.cache)
            .field("output", &self.output)
            .field("signal", &self.signal.is_some())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Value returned by a call, shaped by its [`Output`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Body(Body),
    Response(Response),
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl Payload {
    /// Shapes a response for one caller.
    pub fn project(response: Response, output: Output) -> Result<Self, FetchError> {
        Ok(match output {
            Output::Body => Payload::Body(response.body),
            Output::Response => Payload::Response(response),
            Output::Text => Payload::Text(response.body.to_text()),
            Output::Json => Payload::Json(response.body.to_json()?),
            Output::Bytes => Payload::Bytes(response.body.to_bytes()),
        })
    }

    pub fn into_body(self) -> Option<Body> {
        match self {
            Payload::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Payload::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Payload::Text(text) | Payload::Body(Body::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Payload::Bytes(bytes) | Payload::Body(Body::Binary(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Deserializes the payload as JSON into `T`.
    pub fn deserialize<T>(self) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let value = match self {
            Payload::Json(value) | Payload::Body(Body::Json(value)) => value,
            Payload::Body(body) => body.to_json()?,
            Payload::Response(response) => response.body.to_json()?,
            Payload::Text(text) => serde_json::from_str(&text)?,
            Payload::Bytes(bytes) => serde_json::from_slice(&bytes)?,
        };
        Ok(serde_json::from_value(value)?)
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    method: Method,
    headers: HeaderMap,
    query: IndexMap<String, Option<String>>,
    cache: InstanceCache,
    output: Output,
    before: Option<BeforeFn>,
    after: Option<AfterFn>,
    error: Option<ErrorFn>,
    coordinator: Coordinator,
}

/// HTTP client with in-flight deduplication and a response cache.
///
/// Clones share the transport, the store and the in-flight registry.
/// Separately built clients share nothing.
///
/// ```no_run
/// # use fetchbox::{Fetch, RequestOptions};
/// # async fn run(transport: impl fetchbox::Transport + 'static) -> Result<(), fetchbox::FetchError> {
/// let api = Fetch::builder()
///     .transport(transport)
///     .base_url("https://api.example.com/")
///     .header("Authorization", "Bearer token")
///     .cache("10s")
///     .build()?;
///
/// // Concurrent identical GETs hit the network once.
/// let (a, b) = tokio::join!(
///     api.get("/users", RequestOptions::new()),
///     api.get("/users", RequestOptions::new()),
/// );
/// assert_eq!(a?, b?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Fetch {
    inner: Arc<Inner>,
}

impl Fetch {
    pub fn builder() -> FetchBuilder {
        FetchBuilder::default()
    }

    /// Sends a request and shapes the response by the call's [`Output`].
    pub async fn request(&self, url: &str, options: RequestOptions) -> Result<Payload, FetchError> {
        let output = options.output.unwrap_or(self.inner.output);
        let response = self.send(url, options).await?;
        Payload::project(response, output)
    }

    /// Sends a request and returns the normalized response.
    pub async fn send(&self, url: &str, options: RequestOptions) -> Result<Response, FetchError> {
        let mut request = self.prepare(url, &options)?;
        if let Some(before) = options.before.as_ref().or(self.inner.before.as_ref()) {
            request = before(request);
        }

        let cache = self.inner.cache.resolve(options.cache.as_ref());
        let transport = self.inner.transport.clone();
        let after = options.after.or_else(|| self.inner.after.clone());
        let on_error = options.error.or_else(|| self.inner.error.clone());
        let outgoing = request.clone();

        self.inner
            .coordinator
            .execute(&request, &cache, move || {
                network_call(transport, outgoing, after, on_error)
            })
            .await
    }

    /// Builds the descriptor a call would send, before `before` runs.
    pub fn prepare(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<RequestDescriptor, ConfigurationError> {
        let base_url = match &options.base_url {
            Some(raw) => Some(parse_base_url(raw)?),
            None => self.inner.base_url.clone(),
        };
        let mut query = self.inner.query.clone();
        for (name, value) in &options.query {
            query.insert(name.clone(), value.clone());
        }
        let mut headers = self.inner.headers.clone();
        for (name, value) in &options.headers {
            insert_header(&mut headers, name, value)?;
        }

        let body = match &options.body {
            Some(body) => {
                if matches!(body, RequestBody::Json(_)) && !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(body.encode()?)
            }
            None => None,
        };

        Ok(RequestDescriptor {
            method: options
                .method
                .clone()
                .unwrap_or_else(|| self.inner.method.clone()),
            url: build_url(url, query, base_url.as_ref())?,
            headers,
            body,
            signal: options.signal.clone(),
        })
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::GET)).await
    }

    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::HEAD)).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::POST).body(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::PUT).body(body)).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: impl Into<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::PATCH).body(body)).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Payload, FetchError> {
        self.request(url, options.or_method(Method::DELETE)).await
    }

    /// Alias of [`delete`](Self::delete).
    pub async fn del(&self, url: &str, options: RequestOptions) -> Result<Payload, FetchError> {
        self.delete(url, options).await
    }

    /// `GET` deserializing the body as JSON into `T`.
    pub async fn get_json<T>(&self, url: &str, options: RequestOptions) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        self.get(url, options.output(Output::Json))
            .await?
            .deserialize()
    }

    /// The client's default store.
    pub fn store(&self) -> &Arc<dyn Backend> {
        self.inner.cache.store()
    }

    /// Removes every entry from the client's default store.
    pub async fn clear_cache(&self) -> Result<(), FetchError> {
        self.inner.cache.clear().await?;
        Ok(())
    }

    /// Number of network calls currently shared through the registry.
    pub fn in_flight(&self) -> usize {
        self.inner.coordinator.inflight().len()
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetch")
            .field("base_url", &self.inner.base_url.as_ref().map(Url::as_str))
            .field("method", &self.inner.method)
            .field("output", &self.inner.output)
            .field("cache", &self.inner.cache)
            .field("coordinator", &self.inner.coordinator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Fetch`].
pub struct FetchBuilder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    method: Method,
    headers: IndexMap<String, String>,
    query: IndexMap<String, Option<String>>,
    cache: Option<CacheSetting>,
    output: Output,
    before: Option<BeforeFn>,
    after: Option<AfterFn>,
    error: Option<ErrorFn>,
    invalid: Option<ConfigurationError>,
}

impl Default for FetchBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            base_url: None,
            method: Method::GET,
            headers: IndexMap::new(),
            query: IndexMap::new(),
            cache: None,
            output: Output::Body,
            before: None,
            after: None,
            error: None,
            invalid: None,
        }
    }
}

impl FetchBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Base every relative URL is joined onto.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Default method, `GET` unless set.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), Some(value.to_string()));
        self
    }

    /// Client `cache` option. Caching is off unless set.
    pub fn cache(mut self, cache: impl Into<CacheSetting>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn before<F>(mut self, before: F) -> Self
    where
        F: Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(before));
        self
    }

    pub fn after<F>(mut self, after: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(after));
        self
    }

    pub fn error<F>(mut self, error: F) -> Self
    where
        F: Fn(FetchError) -> Result<Response, FetchError> + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(error));
        self
    }

    /// Applies a file-loaded configuration over the current settings.
    ///
    /// Invalid values are reported by [`build`](Self::build).
    pub fn config(mut self, config: FetchConfig) -> Self {
        if let Some(method) = &config.method {
            match Method::from_bytes(method.to_ascii_uppercase().as_bytes()) {
                Ok(method) => self.method = method,
                Err(_) => self.record(ConfigurationError::InvalidMethod(method.clone())),
            }
        }
        if let Some(output) = &config.output {
            match output.parse() {
                Ok(output) => self.output = output,
                Err(error) => self.record(error),
            }
        }
        for (name, value) in config.query_pairs() {
            self.query.insert(name, value);
        }
        self.headers.extend(config.headers);
        if config.base_url.is_some() {
            self.base_url = config.base_url;
        }
        if config.cache.is_some() {
            self.cache = config.cache;
        }
        self
    }

    fn record(&mut self, error: ConfigurationError) {
        self.invalid.get_or_insert(error);
    }

    pub fn build(self) -> Result<Fetch, ConfigurationError> {
        if let Some(error) = self.invalid {
            return Err(error);
        }
        let transport = self.transport.ok_or(ConfigurationError::MissingTransport)?;
        let base_url = self.base_url.as_deref().map(parse_base_url).transpose()?;
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            insert_header(&mut headers, name, value)?;
        }

        Ok(Fetch {
            inner: Arc::new(Inner {
                transport,
                base_url,
                method: self.method,
                headers,
                query: self.query,
                cache: InstanceCache::new(self.cache),
                output: self.output,
                before: self.before,
                after: self.after,
                error: self.error,
                coordinator: Coordinator::new(),
            }),
        })
    }
}

fn network_call(
    transport: Arc<dyn Transport>,
    request: RequestDescriptor,
    after: Option<AfterFn>,
    on_error: Option<ErrorFn>,
) -> BoxFuture<'static, Result<Response, FetchError>> {
    async move {
        let started = Instant::now();
        let result = perform(transport.as_ref(), request, after.as_deref()).await;
        metrics::record_upstream(started.elapsed(), result.is_ok());
        match (result, on_error) {
            (Err(error), Some(on_error)) => {
                debug!(%error, "Running error interceptor");
                on_error(error)
            }
            (result, _) => result,
        }
    }
    .boxed()
}

async fn perform(
    transport: &dyn Transport,
    request: RequestDescriptor,
    after: Option<&(dyn Fn(Response) -> Response + Send + Sync)>,
) -> Result<Response, FetchError> {
    let raw = transport.fetch(request).await?;
    if !raw.ok() {
        return Err(ResponseError::new(Response::from_transport_lossy(raw)).into());
    }
    let response = Response::from_transport(raw)?;
    Ok(match after {
        Some(after) => after(response),
        None => response,
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason,
    };
    let url = Url::parse(raw).map_err(|error| invalid(error.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be a base".to_owned()));
    }
    Ok(url)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ConfigurationError> {
    let header = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
        .map_err(|_| ConfigurationError::InvalidHeader(name.to_owned()))?;
    let value =
        HeaderValue::from_str(value).map_err(|_| ConfigurationError::InvalidHeader(name.to_owned()))?;
    headers.insert(header, value);
    Ok(())
}

/// Merges `query` with the URL's own query string and joins the result onto
/// `base`. Parameters already in the URL win; `None` values are dropped.
fn build_url(
    url: &str,
    mut query: IndexMap<String, Option<String>>,
    base: Option<&Url>,
) -> Result<String, ConfigurationError> {
    let (path, own_query) = url.split_once('?').unwrap_or((url, ""));
    for (name, value) in form_urlencoded::parse(own_query.as_bytes()) {
        query.insert(name.into_owned(), Some(value.into_owned()));
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(
            query
                .iter()
                .filter_map(|(name, value)| value.as_ref().map(|value| (name, value))),
        )
        .finish();
    let path = if encoded.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{encoded}")
    };

    let Some(base) = base else {
        return Ok(path);
    };
    let relative = path.strip_prefix('/').unwrap_or(&path);
    base.join(relative)
        .map(String::from)
        .map_err(|error| ConfigurationError::InvalidUrl {
            url: url.to_owned(),
            reason: error.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(pairs: &[(&str, Option<&str>)]) -> IndexMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn relative_url_without_base() {
        assert_eq!(build_url("/users", IndexMap::new(), None).unwrap(), "/users");
    }

    #[test]
    fn leading_slash_is_joined_relative_to_base() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            build_url("/users", IndexMap::new(), Some(&base)).unwrap(),
            "https://api.example.com/v1/users"
        );
    }

    #[test]
    fn absolute_url_ignores_base() {
        let base = Url::parse("https://api.example.com/").unwrap();
        assert_eq!(
            build_url("https://other.example.com/a", IndexMap::new(), Some(&base)).unwrap(),
            "https://other.example.com/a"
        );
    }

    #[test]
    fn url_query_wins_and_keeps_first_position() {
        let merged = build_url(
            "/search?b=url&c=3",
            query(&[("a", Some("1")), ("b", Some("option"))]),
            None,
        )
        .unwrap();
        assert_eq!(merged, "/search?a=1&b=url&c=3");
    }

    #[test]
    fn none_values_are_dropped_and_values_encoded() {
        let merged = build_url(
            "/search",
            query(&[("q", Some("a b&c")), ("page", None)]),
            None,
        )
        .unwrap();
        assert_eq!(merged, "/search?q=a+b%26c");
    }

    #[test]
    fn base_url_must_be_absolute() {
        assert!(matches!(
            parse_base_url("/relative"),
            Err(ConfigurationError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("mailto:me@example.com"),
            Err(ConfigurationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn headers_are_lowercased() {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "X-Token", "a").unwrap();
        insert_header(&mut headers, "x-token", "b").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-token").unwrap(), "b");
        assert!(insert_header(&mut headers, "bad header", "x").is_err());
    }

    #[test]
    fn payload_projection() {
        let response = Response::new(http::StatusCode::OK, serde_json::json!({"id": 1}));

        assert_eq!(
            Payload::project(response.clone(), Output::Text).unwrap(),
            Payload::Text(r#"{"id":1}"#.to_owned())
        );
        assert_eq!(
            Payload::project(response.clone(), Output::Body).unwrap(),
            Payload::Body(Body::Json(serde_json::json!({"id": 1})))
        );

        let text = Response::new(http::StatusCode::OK, "not json");
        assert!(matches!(
            Payload::project(text, Output::Json),
            Err(FetchError::Decode(_))
        ));
    }
}
