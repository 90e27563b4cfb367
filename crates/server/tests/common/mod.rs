//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock downloader and a mock format prober injected, so the API can be
//! exercised without yt-dlp installed.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediamine_core::{
    testing::{MockFormatProber, MockProcessBackend, MockScript},
    Config, DownloadManager, DownloaderConfig, ManagerOptions,
};
use mediamine_server::api::create_router;
use mediamine_server::state::AppState;

/// Re-export fixtures for test convenience
pub use mediamine_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// Downloads started through the fixture stay active until driven through
/// `backend.last_controller()`, unless a script is pushed first.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock downloader - script or drive processes
    pub backend: Arc<MockProcessBackend>,
    /// Mock prober - configure available formats
    pub prober: Arc<MockFormatProber>,
    /// The manager behind the router
    pub manager: DownloadManager,
    /// Default download destination
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backend = Arc::new(MockProcessBackend::new());
        backend.set_default_script(MockScript::Manual).await;
        let prober = Arc::new(MockFormatProber::with_formats(fixtures::youtube_formats()));

        let config = Config {
            downloader: DownloaderConfig {
                binary_path: "mock-yt-dlp".into(),
                default_destination: temp_dir.path().to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };

        let manager = DownloadManager::new(
            backend.clone(),
            prober.clone(),
            ManagerOptions::from_config(&config),
        );

        let state = Arc::new(AppState::new(config, manager.clone()));
        let router = create_router(state);

        Self {
            router,
            backend,
            prober,
            manager,
            temp_dir,
        }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Poll a download until it reaches `status` or the timeout expires.
    pub async fn wait_for_status(&self, id: &str, status: &str) -> TestResponse {
        let path = format!("/api/v1/downloads/{}", id);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

        loop {
            let response = self.get(&path).await;
            if response.body["status"] == status || tokio::time::Instant::now() >= deadline {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
