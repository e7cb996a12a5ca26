//! [`Transport`] backed by a [`reqwest::Client`].

use async_trait::async_trait;
use fetchbox_core::{RequestDescriptor, Transport, TransportError, TransportResponse};
use reqwest::{Client, Url};
use tracing::{debug, trace};

/// Sends requests through a shared [`reqwest::Client`].
///
/// Cloning is cheap, the underlying connection pool is shared.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn send(
        &self,
        method: http::Method,
        url: Url,
        headers: http::HeaderMap,
        body: Option<bytes::Bytes>,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(TransportError::connection)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::connection)?;
        trace!(%status, len = body.len(), "Response read");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

impl From<Client> for ReqwestTransport {
    fn from(client: Client) -> Self {
        Self::from_client(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let RequestDescriptor {
            method,
            url,
            headers,
            body,
            signal,
        } = request;

        // Relative URLs are only meaningful with a base, which the client resolves.
        let url = Url::parse(&url)
            .map_err(|error| TransportError::InvalidRequest(format!("{url}: {error}")))?;
        debug!(%method, %url, "Sending request");

        let call = self.send(method, url, headers, body);
        match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    debug!("Request aborted by signal");
                    Err(TransportError::Aborted)
                }
                result = call => result,
            },
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn relative_url_is_rejected() {
        let transport = ReqwestTransport::new();
        let error = transport
            .fetch(RequestDescriptor::new(Method::GET, "/users"))
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::InvalidRequest(message) if message.starts_with("/users")));
    }

    #[tokio::test]
    async fn cancelled_signal_wins() {
        let transport = ReqwestTransport::new();
        let mut request = RequestDescriptor::new(Method::GET, "http://127.0.0.1:9/");
        let signal = fetchbox_core::CancellationToken::new();
        signal.cancel();
        request.signal = Some(signal);

        let error = transport.fetch(request).await.unwrap_err();
        assert!(matches!(error, TransportError::Aborted));
    }
}
