//! Test application factory for integration tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

use pdfgate::server::{build_router, create_app_state_with_converter};
use pdfgate::services::{Converter, RendererHandle};

use super::fake_engine::{EngineStats, FakeLauncher};

/// Test application with router and direct access to the renderer
pub struct TestApp {
    router: axum::Router,
    pub renderer: Arc<RendererHandle>,
    pub stats: Arc<EngineStats>,
}

impl TestApp {
    /// Create a test application with a started fake renderer
    pub async fn new() -> Self {
        Self::with_load_timeout(Duration::from_millis(200)).await
    }

    /// Create a started test application with a custom load timeout
    pub async fn with_load_timeout(load_timeout: Duration) -> Self {
        let app = Self::from_launcher(FakeLauncher::new(), load_timeout);
        app.renderer
            .start()
            .await
            .expect("Fake renderer failed to start");
        app
    }

    /// Create a test application whose renderer has not been started
    pub fn unstarted() -> Self {
        Self::from_launcher(FakeLauncher::new(), Duration::from_millis(200))
    }

    /// Create a started test application whose process started `ago` earlier
    pub async fn started_since(ago: Duration) -> Self {
        let started_at = Instant::now()
            .checked_sub(ago)
            .expect("Monotonic clock too young");
        let app =
            Self::from_launcher_at(FakeLauncher::new(), Duration::from_millis(200), started_at);
        app.renderer
            .start()
            .await
            .expect("Fake renderer failed to start");
        app
    }

    /// Create a test application around any fake launcher, without starting it
    pub fn from_launcher(
        launcher: (FakeLauncher, Arc<EngineStats>),
        load_timeout: Duration,
    ) -> Self {
        Self::from_launcher_at(launcher, load_timeout, Instant::now())
    }

    fn from_launcher_at(
        (launcher, stats): (FakeLauncher, Arc<EngineStats>),
        load_timeout: Duration,
        started_at: Instant,
    ) -> Self {
        let renderer = Arc::new(RendererHandle::new(launcher));
        let converter = Converter::new(renderer.clone()).with_load_timeout(load_timeout);
        let router = build_router(create_app_state_with_converter(converter, started_at));

        Self {
            router,
            renderer,
            stats,
        }
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// Make a GET request with custom headers
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::get(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, path: &str, body: &str) -> TestResponse {
        self.post_raw(path, Some("application/json"), body).await
    }

    /// Make a POST request with an arbitrary (or no) content type
    pub async fn post_raw(
        &self,
        path: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::post(path);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST a conversion request built from a JSON value
    pub async fn convert(&self, body: serde_json::Value) -> TestResponse {
        self.post_json("/convert", &body.to_string()).await
    }

    /// Send a request to the router
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Get a header as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Check if response body looks like a PDF document
    pub fn is_pdf(&self) -> bool {
        self.body.starts_with(b"%PDF-")
    }
}
