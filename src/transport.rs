//! The HTTP transport seam.
//!
//! Everything below this module's [`Transport`] trait (connections, TLS,
//! framing) belongs to `reqwest`. The dispatcher only ever sees a
//! [`TransportRequest`] going in and a [`RawResponse`] or transport
//! [`Error`] coming out.

use crate::request::{ProgressCallback, ProgressEvent, ResponseTransform};
use crate::{Error, Result};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// A fully resolved request, ready to be sent.
#[derive(Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    /// Per-attempt timeout, enforced by the transport.
    pub timeout: Option<Duration>,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
    pub response_transform: Option<ResponseTransform>,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A successful (2xx) response as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// The decoded body, after any response transform.
    pub body: Value,
    /// The body text exactly as received.
    pub raw_body: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Sends a single request attempt.
///
/// Implementations fail with [`Error::HttpError`] on a non-2xx status,
/// [`Error::Timeout`] when the request timed out, and [`Error::Network`] on
/// connection failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing `reqwest::Client`.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Builds a transport with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TLS backend cannot be initialised.
    pub fn try_default() -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self::new(http_client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let upload_len = match &request.body {
            Some(body) => {
                let bytes = serde_json::to_vec(body)
                    .map_err(|e| Error::SerializationFailed(e.to_string()))?;
                let len = bytes.len() as u64;
                builder = builder
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(bytes);
                Some(len)
            }
            None => None,
        };

        let mut response = builder.send().await.map_err(classify)?;

        if let (Some(callback), Some(len)) = (&request.on_upload_progress, upload_len) {
            callback(ProgressEvent {
                loaded: len,
                total: Some(len),
            });
        }

        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();
            return Err(Error::HttpError {
                status,
                raw_response,
                headers,
            });
        }

        let total = response.content_length();
        let mut buffer = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATION) as usize);
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            buffer.extend_from_slice(&chunk);
            if let Some(callback) = &request.on_download_progress {
                callback(ProgressEvent {
                    loaded: buffer.len() as u64,
                    total,
                });
            }
        }

        let raw_body = String::from_utf8_lossy(&buffer).into_owned();
        let body = decode_body(&raw_body, request.response_transform.as_ref());

        Ok(RawResponse {
            body,
            raw_body,
            status,
            headers,
        })
    }
}

fn classify(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}

/// Turns the received text into the caller-facing body.
///
/// A transform wins when present. Otherwise JSON is parsed when possible, an
/// empty body becomes `null`, and anything else is kept as a JSON string.
pub(crate) fn decode_body(raw_body: &str, transform: Option<&ResponseTransform>) -> Value {
    if let Some(transform) = transform {
        return transform(raw_body);
    }
    if raw_body.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw_body).unwrap_or_else(|_| Value::String(raw_body.to_string()))
}
