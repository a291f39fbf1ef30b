#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use coursegate::auth::accounts;
use coursegate::config::ServerConfig;
use coursegate::error::Result;
use coursegate::notify::{Notifier, Outbox};
use coursegate::server::{AppState, create_router};
use coursegate::store::{SqliteStore, Store, seed};
use coursegate::types::{Notification, Role};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

const MULTIPART_BOUNDARY: &str = "coursegate-test-boundary";

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).expect("response is JSON")
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    pub fn error(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }
}

/// The full router over a seeded database in a temp directory, driven
/// in-process.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub outbox: Arc<Outbox>,
    pub notifier: Arc<RecordingNotifier>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            admin_email: ADMIN_EMAIL.to_string(),
            pix_key: "pix@example.com".to_string(),
            ..ServerConfig::default()
        };

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");
        seed::seed_default_catalog(store.as_ref()).expect("seed catalog");
        accounts::create_user(store.as_ref(), "Admin", ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)
            .expect("create admin");

        let notifier = Arc::new(RecordingNotifier::default());
        let outbox = Arc::new(Outbox::new(
            store.clone(),
            notifier.clone(),
            config.notice_settings(),
        ));

        let state = Arc::new(AppState::new(store.clone(), outbox.clone(), &config));
        let router = create_router(state);

        Self {
            temp_dir,
            store,
            outbox,
            notifier,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::GET, path, token, Body::empty(), None)).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::POST, path, token, Body::empty(), None)).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(build(
            Method::POST,
            path,
            token,
            Body::from(body.to_string()),
            Some("application/json".to_string()),
        ))
        .await
    }

    /// Registers an account and returns its session token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let resp = self
            .post_json(
                "/api/v1/auth/register",
                None,
                json!({"name": name, "email": email, "password": "secret1"}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.error());
        resp.data()["token"].as_str().expect("token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        let resp = self
            .post_json(
                "/api/v1/auth/login",
                None,
                json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.data()["token"].as_str().expect("token").to_string()
    }

    /// POST /purchases as multipart. `course_id` is omitted when `None`.
    pub async fn submit_purchase(
        &self,
        token: &str,
        course_id: Option<i64>,
        attachment: Option<(&str, &[u8])>,
    ) -> TestResponse {
        let mut body: Vec<u8> = Vec::new();
        if let Some(id) = course_id {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"course_id\"\r\n\r\n{id}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = attachment {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"attachment\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        self.send(build(
            Method::POST,
            "/api/v1/purchases",
            Some(token),
            Body::from(body),
            Some(format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")),
        ))
        .await
    }

    pub fn course_id(&self, name: &str) -> i64 {
        self.store
            .list_courses()
            .expect("list courses")
            .into_iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("course {name} is seeded"))
            .id
    }

    /// Runs one outbox pass and returns every message delivered so far.
    pub fn deliver(&self) -> Vec<Notification> {
        self.outbox.dispatch_pending().expect("dispatch");
        self.notifier.sent.lock().unwrap().clone()
    }
}

fn build(
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}
