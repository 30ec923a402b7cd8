//! Integration tests using wiremock to simulate the backend.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vapor_client::{
    Client, Error, LogRecord, Logger, ProgressEvent, RouteMethod, RouteRequest,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingLogger {
    entries: Mutex<Vec<(&'static str, String, LogRecord)>>,
}

impl RecordingLogger {
    fn entries(&self) -> Vec<(&'static str, String, LogRecord)> {
        self.entries.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str, record: &LogRecord) {
        self.entries
            .lock()
            .unwrap()
            .push(("log", message.to_string(), record.clone()));
    }

    fn error(&self, message: &str, record: &LogRecord) {
        self.entries
            .lock()
            .unwrap()
            .push(("error", message.to_string(), record.clone()));
    }
}

fn client(base_url: &str, max_retries: usize, logger: Arc<RecordingLogger>) -> Client {
    Client::builder()
        .base_url(base_url)
        .unwrap()
        .max_retries(max_retries)
        .logger(logger)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_route_returns_envelope_and_logs_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "name": "lamp"}]))
                .insert_header("x-custom-header", "custom-value"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let client = client(&mock_server.uri(), 3, logger.clone());

    let response = client
        .route(RouteRequest::new(RouteMethod::Get, "/items"))
        .await
        .unwrap();

    assert_eq!(response.body, json!([{"id": 1, "name": "lamp"}]));
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.header("x-custom-header"), Some("custom-value"));
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    let (level, message, record) = &entries[0];
    assert_eq!(*level, "log");
    assert_eq!(message, "Request to /items succeeded");
    match record {
        LogRecord::Success {
            route,
            method,
            status_code,
            response_headers,
            response_body,
            ..
        } => {
            assert_eq!(route, "/items");
            assert_eq!(*method, RouteMethod::Get);
            assert_eq!(*status_code, 200);
            assert!(response_headers.contains_key("x-custom-header"));
            assert_eq!(response_body, &response.body);
        }
        other => panic!("Expected success record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_data_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let response = client(&mock_server.uri(), 3, logger)
        .fetch_data("/items", Some("tok123"), None)
        .await
        .unwrap();

    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_no_token_means_no_authorization_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let response = client(&mock_server.uri(), 3, logger)
        .fetch_data("/public", None, None)
        .await
        .unwrap();

    // Non-JSON bodies come back as a JSON string.
    assert_eq!(response.body, json!("hello"));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_posts_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(json!({"username": "alice", "password": "s3cret"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("session-abc")
                .insert_header("set-cookie", "sid=abc"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let response = client(&mock_server.uri(), 3, logger.clone())
        .login("/auth", "alice", "s3cret")
        .await
        .unwrap();

    assert_eq!(response.body, "session-abc");
    assert_eq!(response.header("set-cookie"), Some("sid=abc"));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].2.method(), RouteMethod::Post);
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/items/3"))
        .and(body_json(json!({"name": "desk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let client = client(&format!("{}/v1", mock_server.uri()), 3, logger);

    let response = client
        .route(RouteRequest::new(RouteMethod::Put, "/items/3").body(json!({"name": "desk"})))
        .await
        .unwrap();

    assert_eq!(response.body, json!({"id": 3}));
}

#[tokio::test]
async fn test_http_error_propagates_unchanged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/items/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let result = client(&mock_server.uri(), 1, logger.clone())
        .route(RouteRequest::new(RouteMethod::Delete, "/items/9"))
        .await;

    match result {
        Err(Error::HttpError {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(raw_response, "Not found");
        }
        _ => panic!("Expected HttpError, got {:?}", result),
    }

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    let (level, message, record) = &entries[0];
    assert_eq!(*level, "error");
    assert!(message.starts_with("Request to /items/9 failed"));
    assert!(!record.is_success());
}

#[tokio::test]
async fn test_retry_on_transient_failure() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(503).set_body_string("warming up")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
            }
        })
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let start = Instant::now();
    let response = client(&mock_server.uri(), 3, logger.clone())
        .fetch_data("/items", None, None)
        .await
        .unwrap();

    assert_eq!(response.body, json!({"ok": true}));
    assert_eq!(response.attempts, 2);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    assert!(start.elapsed() >= Duration::from_millis(1000));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "log");
}

#[tokio::test]
async fn test_max_retries_bounds_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let start = Instant::now();
    let result = client(&mock_server.uri(), 2, logger.clone())
        .route(RouteRequest::new(RouteMethod::Post, "/items").body(json!({"name": "lamp"})))
        .await;

    assert_eq!(result.unwrap_err().status().map(|s| s.as_u16()), Some(500));
    assert!(start.elapsed() >= Duration::from_millis(1000));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "error");
}

#[tokio::test]
async fn test_timeout_reported_as_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .max_retries(1)
        .logger(logger.clone())
        .build()
        .unwrap();

    let result = client.fetch_data("/slow", None, None).await;
    assert!(matches!(result, Err(Error::Timeout)), "got {:?}", result);
    assert_eq!(logger.entries().len(), 1);
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    let logger = Arc::new(RecordingLogger::default());
    let result = client("http://127.0.0.1:1", 1, logger.clone())
        .fetch_data("/items", None, None)
        .await;

    assert!(matches!(result, Err(Error::Network(_))), "got {:?}", result);
    assert_eq!(logger.entries()[0].0, "error");
}

#[tokio::test]
async fn test_response_transform_and_download_progress() {
    let mock_server = MockServer::start().await;
    let payload = "x".repeat(1024);

    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&mock_server)
        .await;

    let progress: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_clone = progress.clone();

    let logger = Arc::new(RecordingLogger::default());
    let request = RouteRequest::new(RouteMethod::Get, "/blob")
        .response_transform(Arc::new(|raw: &str| json!({ "size": raw.len() })))
        .on_download_progress(Arc::new(move |event: ProgressEvent| {
            progress_clone.lock().unwrap().push(event);
        }));

    let response = client(&mock_server.uri(), 1, logger)
        .route(request)
        .await
        .unwrap();

    assert_eq!(response.body, json!({"size": 1024}));
    assert_eq!(response.raw_body, payload);

    let events = progress.lock().unwrap();
    let last = events.last().expect("at least one progress event");
    assert_eq!(last.loaded, 1024);
    assert_eq!(last.total, Some(1024));
}

#[tokio::test]
async fn test_upload_progress_reports_body_size() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let uploaded: Arc<Mutex<Option<ProgressEvent>>> = Arc::new(Mutex::new(None));
    let uploaded_clone = uploaded.clone();
    let body = json!({"chunk": "abc"});
    let expected_len = serde_json::to_vec(&body).unwrap().len() as u64;

    let logger = Arc::new(RecordingLogger::default());
    let response = client(&mock_server.uri(), 1, logger)
        .route(
            RouteRequest::new(RouteMethod::Post, "/upload")
                .body(body)
                .on_upload_progress(Arc::new(move |event: ProgressEvent| {
                    *uploaded_clone.lock().unwrap() = Some(event);
                })),
        )
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.body, Value::Null);
    assert_eq!(
        *uploaded.lock().unwrap(),
        Some(ProgressEvent {
            loaded: expected_len,
            total: Some(expected_len),
        })
    );
}

#[tokio::test]
async fn test_typed_body() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        name: String,
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "lamp"})))
        .mount(&mock_server)
        .await;

    let logger = Arc::new(RecordingLogger::default());
    let item = client(&mock_server.uri(), 1, logger)
        .fetch_data("/items/1", None, None)
        .await
        .unwrap()
        .deserialize::<Item>()
        .unwrap();

    assert_eq!(
        item.body,
        Item {
            id: 1,
            name: "lamp".to_string()
        }
    );
}
