//! Shared harness: the full router over in-memory adapters, a real JWT
//! service and a cheap Argon2 configuration.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_adapters::axum::{router, AppState};
use async_trait::async_trait;
use auth_adapters::{Argon2Hasher, JwtTokenService};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use domains::{DomainError, DomainResult, MediaStorage, Notifier};
use serde_json::{json, Value};
use services::{Ports, ReplyLimits, Services, UploadPolicy};
use storage_adapters::{LocalMediaStorage, MemoryMediaStorage, MemoryStore};
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";
pub const STAFF_EMAIL: &str = "staff@verdespace.test";

/// PNG signature followed by filler; enough for format sniffing.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(len.max(data.len()), 0);
    data
}

/// Captures every message; optionally fails each send afterwards or
/// stalls before recording it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Sends run on detached tasks; polls until `count` have been recorded.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} notifications, got {:?}", self.sent());
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> DomainResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.messages.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(DomainError::Internal("channel down".into()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub services: Services,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct Options {
    pub notifier: RecordingNotifier,
    pub media: Arc<dyn MediaStorage>,
    pub local_media: Option<Arc<LocalMediaStorage>>,
    pub limits: ReplyLimits,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            notifier: RecordingNotifier::default(),
            media: Arc::new(MemoryMediaStorage::new()),
            local_media: None,
            limits: ReplyLimits::default(),
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(options.notifier);
        let ports = Ports {
            plants: store.clone(),
            images: store.clone(),
            comments: store.clone(),
            wishlists: store.clone(),
            ratings: store.clone(),
            users: store.clone(),
            media: options.media,
            notifier: notifier.clone(),
            hasher: Arc::new(Argon2Hasher::with_cost(1024, 1).unwrap()),
            tokens: Arc::new(JwtTokenService::new(
                b"integration-test-secret",
                chrono::Duration::hours(1),
            )),
        };
        let services = Services::new(ports, UploadPolicy::default(), options.limits);
        let mut state = AppState::new(services.clone());
        if let Some(local) = options.local_media {
            state = state.with_local_media(local);
        }
        Self {
            router: router(state),
            services,
            store,
            notifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }

    pub async fn upload(
        &self,
        path: &str,
        token: Option<&str>,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "verdespace-test-boundary";
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/verdespace/auth/token",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Registers a regular user through the API and returns a token.
    pub async fn user_token(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/verdespace/auth/register",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(email).await
    }

    pub async fn staff_token(&self) -> String {
        // Fails harmlessly when an earlier call already provisioned it.
        let _ = self.services.users.create_staff(STAFF_EMAIL, PASSWORD).await;
        self.login(STAFF_EMAIL).await
    }

    pub async fn create_plant(&self, staff: &str, name: &str) -> String {
        let (status, body) = self
            .post("/api/verdespace/plants", Some(staff), plant_payload(name))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn plant_count(&self, token: &str) -> usize {
        let (status, body) = self.get("/api/verdespace/plants", Some(token)).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().unwrap().len()
    }
}

pub fn plant_payload(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Arching leaves with white stripes.",
        "tips": "Let the soil dry out between waterings.",
        "light_needs": "Bright, indirect",
        "water_needs": "Moderate",
        "care": "Easy",
        "air_purifying": true,
        "allergenic": false,
        "size": "Medium",
        "blooms": false,
        "category": "Air-Purifying"
    })
}
