//! The route-level client.
//!
//! [`Client`] turns a [`RouteRequest`] into a transport request, hands it to
//! the [`RequestDispatcher`], and reports the outcome through the configured
//! [`Logger`]. Use [`ClientBuilder`] to configure and create clients.

use crate::{
    dispatcher::{Dispatched, RequestDispatcher},
    logger::{LogRecord, Logger, TracingLogger},
    request::{resolve_url, ResponseTransform, RouteMethod, RouteRequest},
    retry::RetryPolicy,
    transport::{ReqwestTransport, Transport, TransportRequest},
    Error, Response, Result,
};
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Default number of transport attempts per call.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Immutable settings shared by every call a [`Client`] makes.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Option<Duration>,
    max_retries: usize,
    logger: Arc<dyn Logger>,
    default_headers: HeaderMap,
}

impl ClientConfig {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-attempt timeout passed down to the transport.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Maximum number of transport attempts per call, initial attempt included.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// The retry policy every call is dispatched with.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A client for one backend, with bearer auth, retries and outcome logging.
///
/// Cloning is cheap; clones share configuration and transport.
///
/// # Examples
///
/// ```no_run
/// use vapor_client::{Client, RouteMethod, RouteRequest};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), vapor_client::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(10))
///     .max_retries(3)
///     .build()?;
///
/// let session = client.login("/auth", "alice", "s3cret").await?;
/// let token = session.body;
///
/// let items = client.fetch_data("/items", Some(&token), None).await?;
/// println!("Items: {}", items.body);
///
/// let created = client
///     .route(
///         RouteRequest::new(RouteMethod::Post, "/items")
///             .body(json!({ "name": "lamp" }))
///             .auth_token(token),
///     )
///     .await?;
/// println!("Created with status {}", created.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    dispatcher: RequestDispatcher,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::try_default()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client that sends every attempt through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Client {
            inner: Arc::new(ClientInner {
                config,
                dispatcher: RequestDispatcher::new(transport),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Issues one call and returns its response envelope.
    ///
    /// Exactly one record is logged per call: [`Logger::log`] on success,
    /// [`Logger::error`] on failure.
    ///
    /// # Errors
    ///
    /// Returns the transport's last error once retries are exhausted, or a
    /// configuration/URL error if the request could not be built. Errors are
    /// never wrapped.
    pub async fn route(&self, request: RouteRequest) -> Result<Response<Value>> {
        let start_time = Instant::now();
        let route = request.path.clone();
        let method = request.method;
        let logger = &self.inner.config.logger;

        match self.dispatch(request).await {
            Ok(Dispatched {
                response,
                attempts,
            }) => {
                let record = LogRecord::success(
                    &route,
                    method,
                    response.status.as_u16(),
                    &response.headers,
                    &response.body,
                );
                logger.log(&format!("Request to {} succeeded", route), &record);

                Ok(Response::new(
                    response.body,
                    response.raw_body,
                    response.status,
                    response.headers,
                    start_time.elapsed(),
                    attempts,
                ))
            }
            Err(e) => {
                let record = LogRecord::failure(&route, method, &e);
                logger.error(&format!("Request to {} failed: {}", route, e), &record);
                Err(e)
            }
        }
    }

    /// POSTs `{"username", "password"}` to `route` without a per-call bearer token.
    ///
    /// Whatever the backend hands back (a token, a session id) is returned as
    /// the body text; JSON string bodies are unwrapped.
    pub async fn login(
        &self,
        route: impl Into<String>,
        username: &str,
        password: &str,
    ) -> Result<Response<String>> {
        let request = RouteRequest::new(RouteMethod::Post, route)
            .body(json!({ "username": username, "password": password }));

        let response = self.route(request).await?;
        Ok(response.map(|body| match body {
            Value::String(text) => text,
            other => other.to_string(),
        }))
    }

    /// GETs `route`, optionally with a bearer token and a response transform.
    pub async fn fetch_data(
        &self,
        route: impl Into<String>,
        token: Option<&str>,
        transform: Option<ResponseTransform>,
    ) -> Result<Response<Value>> {
        let mut request = RouteRequest::new(RouteMethod::Get, route);
        request.auth_token = token.map(str::to_string);
        request.response_transform = transform;
        self.route(request).await
    }

    async fn dispatch(&self, request: RouteRequest) -> Result<Dispatched> {
        let transport_request = self.build_transport_request(request)?;
        self.inner
            .dispatcher
            .execute(&transport_request, &self.inner.config.retry_policy())
            .await
    }

    fn build_transport_request(&self, request: RouteRequest) -> Result<TransportRequest> {
        let config = &self.inner.config;

        let mut url = resolve_url(&config.base_url, &request.path)?;
        if !request.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query_params {
                pairs.append_pair(key, value);
            }
        }

        // Per-request headers replace defaults of the same name, repeated values included.
        let mut headers = config.default_headers.clone();
        for name in request.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &request.headers {
            headers.append(name, value.clone());
        }

        if let Some(value) = bearer_header(request.auth_token.as_deref())? {
            headers.insert(AUTHORIZATION, value);
        }

        Ok(TransportRequest {
            method: request.method.as_http(),
            url,
            body: request.body,
            headers,
            timeout: config.timeout,
            on_upload_progress: request.on_upload_progress,
            on_download_progress: request.on_download_progress,
            response_transform: request.response_transform,
        })
    }
}

/// Builds a sensitive `Authorization: Bearer <token>` value.
///
/// An absent or empty token yields no header.
fn bearer_header(token: Option<&str>) -> Result<Option<HeaderValue>> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let mut value = HeaderValue::try_from(format!("Bearer {}", token))
        .map_err(|e| Error::ConfigurationError(format!("Invalid bearer token: {}", e)))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

/// Builder for configuring and creating a [`Client`].
///
/// Unset options fall back to named defaults: no timeout,
/// [`DEFAULT_MAX_RETRIES`] attempts, the [`TracingLogger`] sink, no default
/// headers, and a `reqwest` transport.
///
/// # Examples
///
/// ```no_run
/// use vapor_client::ClientBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), vapor_client::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .max_retries(5)
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    max_retries: usize,
    token: Option<String>,
    logger: Option<Arc<dyn Logger>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
            max_retries: DEFAULT_MAX_RETRIES,
            token: None,
            logger: None,
            transport: None,
        }
    }

    /// Sets the base address every route is resolved against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the per-attempt timeout enforced by the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of transport attempts per call. Must be at least 1.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets a bearer token sent with every request.
    ///
    /// An empty token is ignored. A per-request
    /// [`auth_token`](RouteRequest::auth_token) takes precedence.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replaces the default [`TracingLogger`] sink.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validates the settings and produces a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, `max_retries` is zero,
    /// or the token is not a valid header value.
    pub fn build_config(&self) -> Result<ClientConfig> {
        let base_url = self
            .base_url
            .clone()
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;

        if self.max_retries == 0 {
            return Err(Error::ConfigurationError(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let mut default_headers = self.default_headers.clone();
        if let Some(value) = bearer_header(self.token.as_deref())? {
            default_headers.insert(AUTHORIZATION, value);
        }

        Ok(ClientConfig {
            base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            logger: self
                .logger
                .clone()
                .unwrap_or_else(|| Arc::new(TracingLogger)),
            default_headers,
        })
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Client> {
        let config = self.build_config()?;
        match self.transport {
            Some(transport) => Ok(Client::with_transport(config, transport)),
            None => Client::new(config),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
