//! The response envelope returned by every successful call.

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A header as exposed in logs: a single value, or every value when the
/// header was repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderField {
    Single(String),
    Multiple(Vec<String>),
}

/// Flattens a [`HeaderMap`] into `name → value(s)`.
///
/// Values that are not visible ASCII are replaced lossily.
pub fn header_fields(headers: &HeaderMap) -> BTreeMap<String, HeaderField> {
    let mut fields = BTreeMap::new();
    for name in headers.keys() {
        let mut values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        let field = if values.len() == 1 {
            HeaderField::Single(values.remove(0))
        } else {
            HeaderField::Multiple(values)
        };
        fields.insert(name.as_str().to_string(), field);
    }
    fields
}

/// A successful response: decoded body, status, headers and call metadata.
///
/// # Examples
///
/// ```no_run
/// use vapor_client::Client;
///
/// # async fn example() -> Result<(), vapor_client::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.fetch_data("/items", Some("tok123"), None).await?;
///
/// println!("Status: {}", response.status);
/// println!("Body: {}", response.body);
/// println!("Took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The response body, after any response transform.
    pub body: T,

    /// The body text exactly as the server sent it.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the successful response, backoff included.
    pub latency: Duration,

    /// Number of transport attempts made; `1` when the first try succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    pub fn new(
        body: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            body,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the body to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vapor_client::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.body, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            body: f(self.body),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the call needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the headers as `name → value(s)`.
    pub fn header_fields(&self) -> BTreeMap<String, HeaderField> {
        header_fields(&self.headers)
    }
}

impl Response<Value> {
    /// Deserializes the JSON body into `U`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] with the raw body attached when
    /// the body does not match `U`.
    pub fn deserialize<U: DeserializeOwned>(self) -> Result<Response<U>> {
        match serde_json::from_value::<U>(self.body.clone()) {
            Ok(body) => Ok(self.map(|_| body)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %self.raw_body,
                    "Failed to deserialize response"
                );
                Err(Error::DeserializationFailed {
                    raw_response: self.raw_body,
                    serde_error: e.to_string(),
                    status: self.status,
                })
            }
        }
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.body
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.body
    }
}
