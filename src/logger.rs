//! Outcome logging for routed calls.
//!
//! Every call to [`Client::route`](crate::Client::route) produces exactly one
//! [`LogRecord`], handed to either [`Logger::log`] or [`Logger::error`].

use crate::request::RouteMethod;
use crate::response::{header_fields, HeaderField};
use http::HeaderMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Structured description of a call's terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    Success {
        route: String,
        method: RouteMethod,
        status_code: u16,
        response_headers: BTreeMap<String, HeaderField>,
        response_body: Value,
        #[serde(serialize_with = "serialize_timestamp")]
        timestamp: SystemTime,
    },
    Failure {
        route: String,
        method: RouteMethod,
        error: String,
        #[serde(serialize_with = "serialize_timestamp")]
        timestamp: SystemTime,
    },
}

impl LogRecord {
    pub(crate) fn success(
        route: &str,
        method: RouteMethod,
        status_code: u16,
        headers: &HeaderMap,
        body: &Value,
    ) -> Self {
        LogRecord::Success {
            route: route.to_string(),
            method,
            status_code,
            response_headers: header_fields(headers),
            response_body: body.clone(),
            timestamp: SystemTime::now(),
        }
    }

    pub(crate) fn failure(route: &str, method: RouteMethod, error: &crate::Error) -> Self {
        LogRecord::Failure {
            route: route.to_string(),
            method,
            error: error.to_string(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn route(&self) -> &str {
        match self {
            LogRecord::Success { route, .. } | LogRecord::Failure { route, .. } => route,
        }
    }

    pub fn method(&self) -> RouteMethod {
        match self {
            LogRecord::Success { method, .. } | LogRecord::Failure { method, .. } => *method,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LogRecord::Success { .. })
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &SystemTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&httpdate::fmt_http_date(*timestamp))
}

/// Sink for call outcomes.
///
/// Substitute any implementation through
/// [`ClientBuilder::logger`](crate::ClientBuilder::logger).
#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    /// Records a successful call.
    fn log(&self, message: &str, record: &LogRecord);

    /// Records a failed call.
    fn error(&self, message: &str, record: &LogRecord);
}

/// The default [`Logger`]: forwards records to `tracing` at `INFO`/`ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str, record: &LogRecord) {
        tracing::info!(
            route = record.route(),
            method = %record.method(),
            record = %render(record),
            "{}",
            message
        );
    }

    fn error(&self, message: &str, record: &LogRecord) {
        tracing::error!(
            route = record.route(),
            method = %record.method(),
            record = %render(record),
            "{}",
            message
        );
    }
}

fn render(record: &LogRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|e| format!("<unserializable record: {}>", e))
}
