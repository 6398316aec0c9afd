#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use ledgerline_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

/// Test harness backed by an in-memory SQLite database. The pool is pinned
/// to a single connection so every query sees the same in-memory database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let db_cfg = db::DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("database connection");
        db::run_migrations(&pool).await.expect("migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);
        let event_task = tokio::spawn(events::process_events(
            event_rx,
            Some(services.installments.clone()),
        ));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(ledgerline_api::health_routes())
            .nest("/api/v1", ledgerline_api::api_v1_routes())
            .with_state(state.clone())
            .layer(axum::middleware::from_fn(
                ledgerline_api::middleware_helpers::request_id::request_id_middleware,
            ));

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(serde_json::to_vec(&json).unwrap()))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Creates a draft purchase order and returns its id.
    pub async fn create_order(&self, total_amount: &str) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/purchase-orders",
                Some(json!({
                    "supplier_id": Uuid::new_v4(),
                    "total_amount": total_amount,
                    "currency": "USD"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        field_uuid(&body, "id")
    }

    /// Allocates an installment through the API and returns the response body.
    pub async fn allocate(&self, order_id: Uuid, amount: &str) -> (StatusCode, Value) {
        let response = self
            .request(
                Method::POST,
                &format!("/api/v1/purchase-orders/{}/installments", order_id),
                Some(json!({ "amount": amount })),
            )
            .await;
        let status = response.status();
        (status, response_json(response).await)
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json response")
    }
}

pub fn field_uuid(value: &Value, key: &str) -> Uuid {
    value
        .get(key)
        .and_then(Value::as_str)
        .expect("uuid field present")
        .parse()
        .expect("valid uuid")
}

pub fn field_decimal(value: &Value, key: &str) -> Decimal {
    let raw = value.get(key).expect("decimal field present");
    serde_json::from_value(raw.clone()).expect("valid decimal")
}
