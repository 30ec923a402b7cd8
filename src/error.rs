//! Error types for routed HTTP calls.
//!
//! Transport failures are surfaced exactly as the transport reported them: the
//! dispatcher retries them and the client logs them, but neither wraps them.

use http::{HeaderMap, StatusCode};

/// The error type for every fallible operation in this crate.
///
/// # Examples
///
/// ```no_run
/// use vapor_client::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.fetch_data("/items", Some("tok123"), None).await {
///     Ok(response) => println!("Items: {}", response.body),
///     Err(Error::HttpError { status, raw_response, .. }) => {
///         eprintln!("HTTP error {}: {}", status, raw_response);
///     }
///     Err(Error::Timeout) => eprintln!("Backend did not answer in time"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS failure, broken body stream).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The transport gave up waiting for the backend.
    #[error("Request timed out")]
    Timeout,

    /// The server returned a non-2xx HTTP status code.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// Failed to convert a response body into the requested type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided, such as a bad header value or a zero retry count.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The base address or a route could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if the error was reported by the transport.
    ///
    /// These are the only failures the dispatcher ever sees; everything else
    /// happens before a request leaves the client.
    ///
    /// ```
    /// use vapor_client::Error;
    ///
    /// assert!(Error::Timeout.is_transport());
    /// assert!(!Error::ConfigurationError("bad".to_string()).is_transport());
    /// ```
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::HttpError { .. }
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for routed HTTP calls.
pub type Result<T> = std::result::Result<T, Error>;
