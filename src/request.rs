//! Per-call request description and the callback types it carries.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Rewrites the raw response text into the body handed back to the caller.
///
/// When no transform is set, the body is parsed as JSON, falling back to the
/// raw text as a JSON string.
pub type ResponseTransform = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// Receives upload or download progress notifications.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A progress notification for a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Total bytes expected, when known.
    pub total: Option<u64>,
}

/// The HTTP methods a route can be called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RouteMethod {
    /// Returns the matching [`http::Method`].
    pub fn as_http(self) -> Method {
        match self {
            RouteMethod::Get => Method::GET,
            RouteMethod::Post => Method::POST,
            RouteMethod::Put => Method::PUT,
            RouteMethod::Delete => Method::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to issue one call against the backend.
///
/// Built fresh for every call and consumed by [`Client::route`](crate::Client::route).
///
/// # Examples
///
/// ```
/// use vapor_client::{RouteMethod, RouteRequest};
/// use serde_json::json;
///
/// let request = RouteRequest::new(RouteMethod::Put, "/items/7")
///     .body(json!({ "name": "lamp" }))
///     .auth_token("tok123")
///     .with_query_param("notify", "false");
///
/// assert_eq!(request.method, RouteMethod::Put);
/// assert_eq!(request.auth_token.as_deref(), Some("tok123"));
/// ```
#[derive(Clone)]
pub struct RouteRequest {
    /// The HTTP method.
    pub method: RouteMethod,

    /// The route, relative to the client's base address.
    pub path: String,

    /// Optional JSON body.
    pub body: Option<Value>,

    /// Bearer token for the `Authorization` header.
    pub auth_token: Option<String>,

    /// Optional rewrite of the raw response body.
    pub response_transform: Option<ResponseTransform>,

    pub on_upload_progress: Option<ProgressCallback>,

    pub on_download_progress: Option<ProgressCallback>,

    /// Additional headers for this call.
    pub headers: HeaderMap,

    /// Query parameters for this call.
    pub query_params: HashMap<String, String>,
}

impl RouteRequest {
    /// Creates a request with the given method and route and nothing else set.
    pub fn new(method: RouteMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth_token: None,
            response_transform: None,
            on_upload_progress: None,
            on_download_progress: None,
            headers: HeaderMap::new(),
            query_params: HashMap::new(),
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn response_transform(mut self, transform: ResponseTransform) -> Self {
        self.response_transform = Some(transform);
        self
    }

    pub fn on_upload_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_upload_progress = Some(callback);
        self
    }

    pub fn on_download_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_download_progress = Some(callback);
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Debug for RouteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("response_transform", &self.response_transform.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("on_download_progress", &self.on_download_progress.is_some())
            .field("headers", &self.headers)
            .field("query_params", &self.query_params)
            .finish()
    }
}

/// Joins a route onto the base address.
///
/// Only `scheme://...` and protocol-relative `//host/...` routes are absolute;
/// the latter inherit the base's scheme. Everything else, including routes
/// with a colon such as `items:batch`, is joined onto the base (keeping any
/// path prefix it carries) with exactly one `/` in between.
pub(crate) fn resolve_url(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    if path.starts_with("//") {
        return base.join(path);
    }
    if has_scheme_prefix(path) {
        return Url::parse(path);
    }

    if path.is_empty() {
        return Ok(base.clone());
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
}

/// Matches `^[a-z][a-z0-9+.-]*://`, case-insensitively.
fn has_scheme_prefix(path: &str) -> bool {
    let Some((scheme, _)) = path.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
