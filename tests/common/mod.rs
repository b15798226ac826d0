// Each integration test binary compiles this module separately and uses
// a different subset of the helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use mesa_pos::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

/// Test harness: the full application router over a throwaway SQLite
/// database, driven with in-process `oneshot` requests.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Fresh application with default test configuration.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(String::new(), "test".to_string());
        Self::with_config(cfg).await
    }

    /// Fresh application with a caller-adjusted configuration. The
    /// database URL is always replaced with a throwaway SQLite file.
    pub async fn with_config(mut cfg: AppConfig) -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("mesa_pos_test.db");
        cfg.database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let db_pool = Arc::new(pool);

        db::run_migrations(&db_pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_pool.clone(), Arc::new(event_sender.clone()), &cfg)
            .expect("failed to build services");

        let state = AppState {
            db: db_pool,
            config: cfg,
            event_sender,
            services,
        };
        let router = app_router().with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    /// POST with a raw text body, for the inventory import endpoint.
    pub async fn post_text(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "text/csv")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

/// Extracts the `data` payload from an `ApiResponse` body, panicking with
/// the whole body on failure so assertions stay readable.
pub fn data(body: &Value) -> &Value {
    body.get("data")
        .unwrap_or_else(|| panic!("response has no data field: {body}"))
}

/// Parses a JSON money/quantity field into a `Decimal`. Amounts serialize
/// as strings, but their scale depends on the database backend, so tests
/// compare numeric values rather than string representations.
pub fn money(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap_or_else(|_| panic!("not a decimal: {s}")),
        Value::Number(n) => n
            .to_string()
            .parse()
            .unwrap_or_else(|_| panic!("not a decimal: {n}")),
        other => panic!("not a decimal: {other:?}"),
    }
}
