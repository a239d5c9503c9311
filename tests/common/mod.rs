use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    entities::{product, product_variant},
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::{CreateProductInput, CreateVariantInput},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database. A single pooled connection keeps the in-memory
/// schema alive for the lifetime of the app.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Some(event_sender));

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, &[], body).await
    }

    /// Send a JSON request carrying extra headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed a product with the given price, optional cost and stock level.
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        cost: Option<Decimal>,
        stock_quantity: i32,
    ) -> product::Model {
        self.state
            .services
            .catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                slug: format!(
                    "{}-{}",
                    name.to_lowercase().replace(' ', "-"),
                    Uuid::new_v4().simple()
                ),
                description: Some("Seeded for integration tests".to_string()),
                sku: Some(format!("SKU-{}", Uuid::new_v4().simple())),
                price,
                cost,
                stock_quantity,
                category_id: None,
            })
            .await
            .expect("seed product for tests")
    }

    /// Seed a variant under an existing product.
    pub async fn seed_variant(
        &self,
        product_id: Uuid,
        price: Decimal,
        cost: Option<Decimal>,
        stock_quantity: i32,
    ) -> product_variant::Model {
        self.state
            .services
            .catalog
            .create_variant(
                product_id,
                CreateVariantInput {
                    sku_variant: Some(format!("VAR-{}", Uuid::new_v4().simple())),
                    color: Some("black".to_string()),
                    size: Some("M".to_string()),
                    price,
                    cost,
                    stock_quantity,
                },
            )
            .await
            .expect("seed product variant for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Deserialize the response body into JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not valid json")
}
