use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::account::account_router;
use super::admin::admin_router;
use super::user::user_router;
use crate::auth::AuthSettings;
use crate::config::ServerConfig;
use crate::notify::Outbox;
use crate::store::Store;
use crate::uploads::AttachmentStorage;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub outbox: Arc<Outbox>,
    pub attachments: AttachmentStorage,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, outbox: Arc<Outbox>, config: &ServerConfig) -> Self {
        Self {
            store,
            outbox,
            attachments: AttachmentStorage::new(&config.data_dir),
            auth: config.auth_settings(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", account_router())
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
