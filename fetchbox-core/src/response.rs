//! Normalized response types.
//!
//! The transport hands back a [`TransportResponse`] with raw bytes. Before
//! anything else sees it, the client turns it into a [`Response`]:
//!
//! - header names are lowercased into a plain ordered map
//! - the body is decoded into a [`Body`] based on the `content-type`
//!
//! A `Response` is the value stored by every cache backend, so it is fully
//! serializable.
//!
//! [`TransportResponse`]: crate::TransportResponse

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::TransportResponse;

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    /// Payload served with a JSON content type.
    Json(serde_json::Value),
    /// Any other UTF-8 payload.
    Text(String),
    /// Payload that is not valid UTF-8.
    Binary(Bytes),
}

impl Body {
    /// Decodes raw bytes according to a `content-type` header value.
    ///
    /// JSON is only attempted when the content type mentions
    /// `application/json`; an empty payload is always empty text.
    pub fn decode(content_type: Option<&str>, bytes: Bytes) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(Body::Text(String::new()));
        }
        if content_type.is_some_and(|value| value.contains("application/json")) {
            return serde_json::from_slice(&bytes).map(Body::Json);
        }
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(Body::Text(text)),
            Err(_) => Ok(Body::Binary(bytes)),
        }
    }

    /// Returns the body as text, serializing JSON and lossily decoding binary.
    pub fn to_text(&self) -> String {
        match self {
            Body::Json(value) => value.to_string(),
            Body::Text(text) => text.clone(),
            Body::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Returns the body as raw bytes.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Json(value) => Bytes::from(value.to_string()),
            Body::Text(text) => Bytes::from(text.clone()),
            Body::Binary(bytes) => bytes.clone(),
        }
    }

    /// Returns the body as a JSON value, parsing text bodies on demand.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Body::Json(value) => Ok(value.clone()),
            Body::Text(text) => serde_json::from_str(text),
            Body::Binary(bytes) => serde_json::from_slice(bytes),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

fn lowercase_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    // HeaderName is lowercase already. Repeated fields are joined with ", ";
    // values that are not visible ASCII are kept lossily.
    headers
        .keys()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect::<Vec<_>>();
            (name.as_str().to_owned(), values.join(", "))
        })
        .collect()
}

/// Normalized response: status, lowercase headers and decoded body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Numeric status code.
    pub status: u16,
    /// Canonical reason phrase for the status, empty if unknown.
    pub status_text: String,
    /// Response headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Decoded body.
    pub body: Body,
}

impl Response {
    /// Creates a response with the given status and body and no headers.
    pub fn new(status: StatusCode, body: impl Into<Body>) -> Self {
        Self::from_parts(status, BTreeMap::new(), body.into())
    }

    /// Normalizes a transport response.
    ///
    /// Fails only when a JSON payload cannot be parsed.
    pub fn from_transport(response: TransportResponse) -> Result<Self, serde_json::Error> {
        let headers = lowercase_headers(&response.headers);
        let body = Body::decode(
            headers.get("content-type").map(String::as_str),
            response.body,
        )?;
        Ok(Self::from_parts(response.status, headers, body))
    }

    /// Like [`from_transport`](Self::from_transport) but never fails: a body
    /// that does not parse as JSON is kept as lossy text.
    ///
    /// Used for error responses, where the payload is context and not data.
    pub fn from_transport_lossy(response: TransportResponse) -> Self {
        let headers = lowercase_headers(&response.headers);
        let body = Body::decode(
            headers.get("content-type").map(String::as_str),
            response.body.clone(),
        )
        .unwrap_or_else(|_| Body::Text(String::from_utf8_lossy(&response.body).into_owned()));
        Self::from_parts(response.status, headers, body)
    }

    fn from_parts(status: StatusCode, headers: BTreeMap<String, String>, body: Body) -> Self {
        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            headers,
            body,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn transport(content_type: Option<&'static str>, body: &'static [u8]) -> TransportResponse {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert("Content-Type", HeaderValue::from_static(content_type));
        }
        TransportResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn json_content_type_is_parsed() {
        let response = Response::from_transport(transport(
            Some("application/json; charset=utf-8"),
            br#"{"secret":"12345"}"#,
        ))
        .unwrap();

        assert_eq!(response.body, Body::Json(serde_json::json!({"secret": "12345"})));
        assert_eq!(
            response.header("Content-Type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", HeaderValue::from_static("a=1"));
        headers.append("Set-Cookie", HeaderValue::from_static("b=2"));
        headers.append("Vary", HeaderValue::from_static("accept"));
        headers.append("Vary", HeaderValue::from_static("origin"));
        let response = Response::from_transport(TransportResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"ok"),
        })
        .unwrap();

        assert_eq!(response.header("set-cookie"), Some("a=1, b=2"));
        assert_eq!(response.header("vary"), Some("accept, origin"));
        assert_eq!(response.headers.len(), 2);
    }

    #[test]
    fn text_is_default() {
        let response = Response::from_transport(transport(None, b"hello")).unwrap();
        assert_eq!(response.body, Body::Text("hello".to_owned()));
        assert_eq!(response.status_text, "OK");
        assert!(response.ok());
    }

    #[test]
    fn invalid_utf8_is_binary() {
        let response = Response::from_transport(transport(None, &[0xff, 0xfe])).unwrap();
        assert_eq!(response.body, Body::Binary(Bytes::from_static(&[0xff, 0xfe])));
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(Response::from_transport(transport(Some("application/json"), b"{")).is_err());
    }

    #[test]
    fn lossy_keeps_broken_json_as_text() {
        let response = Response::from_transport_lossy(transport(Some("application/json"), b"{"));
        assert_eq!(response.body, Body::Text("{".to_owned()));
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn empty_json_body_is_empty_text() {
        let response = Response::from_transport(transport(Some("application/json"), b"")).unwrap();
        assert_eq!(response.body, Body::Text(String::new()));
    }

    #[test]
    fn survives_json_round_trip_for_stores() {
        let response = Response::new(StatusCode::CREATED, serde_json::json!([1, 2, 3]));
        let encoded = serde_json::to_vec(&response).unwrap();
        let decoded: Response = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, response);
    }
}
