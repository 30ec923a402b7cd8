//! # vapor-client - a thin retrying route helper
//!
//! `vapor-client` issues HTTP calls against one backend base address. Each call
//! can carry a bearer token, is retried with exponential backoff when the
//! transport fails, and has its outcome reported exactly once through a
//! pluggable [`Logger`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use vapor_client::{Client, RouteMethod, RouteRequest};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vapor_client::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(10))
//!         .max_retries(3)
//!         .build()?;
//!
//!     // POST credentials; the backend answers with a token
//!     let token = client.login("/auth", "alice", "s3cret").await?.body;
//!
//!     // GET with `Authorization: Bearer <token>`
//!     let items = client.fetch_data("/items", Some(&token), None).await?;
//!     println!("Items: {}", items.body);
//!
//!     // Anything else goes through `route`
//!     let removed = client
//!         .route(RouteRequest::new(RouteMethod::Delete, "/items/7").auth_token(token))
//!         .await?;
//!     println!("Deleted with status {}", removed.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! A call is attempted at most `max_retries` times (default 3). After the
//! n-th failure the client waits `1000ms * 2^(n-1)`, so the default policy
//! waits 1s and then 2s. Every transport failure is retried the same way,
//! including non-idempotent methods, and the last failure is returned as-is.
//!
//! ## Logging
//!
//! Each call produces one [`LogRecord`]: `success` with status, headers and
//! body, or `failure` with the error text. The default [`TracingLogger`]
//! forwards it to `tracing`; plug in your own sink with
//! [`ClientBuilder::logger`].

mod client;
pub mod dispatcher;
mod error;
pub mod logger;
mod request;
mod response;
pub mod retry;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientConfig, DEFAULT_MAX_RETRIES};
pub use dispatcher::{Dispatched, RequestDispatcher};
pub use error::{Error, Result};
pub use logger::{LogRecord, Logger, TracingLogger};
pub use request::{
    ProgressCallback, ProgressEvent, ResponseTransform, RouteMethod, RouteRequest,
};
pub use response::{header_fields, HeaderField, Response};
pub use retry::RetryPolicy;
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportRequest};
