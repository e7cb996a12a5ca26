#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use fetchbox::{
    Backend, BackendError, MemoryBackend, RequestDescriptor, Transport, TransportError,
    TransportResponse,
};
use fetchbox_backend::{BackendResult, DeleteStatus};
use fetchbox_core::{CacheKey, Raw};
use http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};

type Responder =
    dyn Fn(&RequestDescriptor, usize) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport that answers from a script and counts calls.
///
/// The default script answers `200 text/plain` with `"call <n>"`, `n`
/// starting at 1, so tests can tell fresh network calls apart.
#[derive(Clone)]
pub struct MockTransport {
    responder: Arc<Responder>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RequestDescriptor>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::respond(|_, call| Ok(text(StatusCode::OK, &format!("call {call}"))))
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor, usize) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Arc::new(responder),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers with `status` and a text body.
    pub fn status(status: StatusCode, body: &'static str) -> Self {
        Self::respond(move |_, _| Ok(text(status, body)))
    }

    /// Always answers `200` with a JSON body.
    pub fn json(body: serde_json::Value) -> Self {
        Self::respond(move |_, _| Ok(json(StatusCode::OK, &body)))
    }

    /// Always fails at the connection level.
    pub fn refused() -> Self {
        Self::respond(|_, _| {
            Err(TransportError::connection(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            match &request.signal {
                Some(signal) => tokio::select! {
                    _ = signal.cancelled() => return Err(TransportError::Aborted),
                    _ = tokio::time::sleep(self.delay) => {}
                },
                None => tokio::time::sleep(self.delay).await,
            }
        } else if request.is_cancelled() {
            return Err(TransportError::Aborted);
        }

        (self.responder)(&request, call)
    }
}

pub fn text(status: StatusCode, body: &str) -> TransportResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    TransportResponse {
        status,
        headers,
        body: Bytes::from(body.to_owned()),
    }
}

pub fn json(status: StatusCode, body: &serde_json::Value) -> TransportResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    TransportResponse {
        status,
        headers,
        body: Bytes::from(body.to_string()),
    }
}

/// Memory store that counts every operation.
#[derive(Clone, Debug, Default)]
pub struct CountingBackend {
    pub inner: MemoryBackend,
    pub reads: Arc<AtomicUsize>,
    pub writes: Arc<AtomicUsize>,
    pub exists_checks: Arc<AtomicUsize>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn exists_checks(&self) -> usize {
        self.exists_checks.load(Ordering::SeqCst)
    }

    /// Number of store interactions of any kind.
    pub fn touched(&self) -> usize {
        self.reads() + self.writes() + self.exists_checks()
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw, ttl: Duration) -> BackendResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(key, value, ttl).await
    }

    async fn exists(&self, key: &CacheKey) -> BackendResult<bool> {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        self.inner.keys().await
    }

    async fn flush_all(&self) -> BackendResult<()> {
        self.inner.flush_all().await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Store whose writes always fail.
#[derive(Clone, Debug, Default)]
pub struct ReadOnlyBackend;

#[async_trait]
impl Backend for ReadOnlyBackend {
    async fn read(&self, _key: &CacheKey) -> BackendResult<Option<Raw>> {
        Ok(None)
    }

    async fn write(&self, _key: &CacheKey, _value: Raw, _ttl: Duration) -> BackendResult<()> {
        Err(BackendError::InternalError("store is read-only".into()))
    }

    async fn remove(&self, _key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(DeleteStatus::Missing)
    }

    async fn keys(&self) -> BackendResult<Vec<CacheKey>> {
        Ok(Vec::new())
    }

    async fn flush_all(&self) -> BackendResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "read-only"
    }
}
