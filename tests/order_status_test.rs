mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    entities::order::{OrderSource, OrderStatus},
    errors::ServiceError,
    services::orders::{CreateOrderInput, OrderLineInput},
};
use uuid::Uuid;

async fn seed_order(app: &TestApp) -> storefront_api::services::orders::OrderDetails {
    let product = app.seed_product("Lamp", dec!(100), Some(dec!(40)), 10).await;
    app.state
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_name: "Lina M".to_string(),
            customer_phone: "0770123456".to_string(),
            customer_wilaya: None,
            customer_baladiya: None,
            customer_address: None,
            customer_email: None,
            items: vec![OrderLineInput {
                product_id: Some(product.id),
                variant_id: None,
                quantity: 1,
            }],
            delivery_fee: dec!(400),
            order_source: OrderSource::Website,
            created_by_id: None,
            notes: None,
        })
        .await
        .expect("seed order")
}

#[tokio::test]
async fn delivered_transition_stamps_only_delivered_at() {
    let app = TestApp::new().await;
    let created = seed_order(&app).await;

    let updated = app
        .state
        .services
        .orders
        .update_status(created.order.id, OrderStatus::Delivered)
        .await
        .expect("status update");

    assert_eq!(updated.order.status, OrderStatus::Delivered);
    assert!(updated.order.delivered_at.is_some());
    assert!(updated.order.confirmed_at.is_none());
    assert!(updated.order.shipped_at.is_none());
    assert!(updated.order.cancelled_at.is_none());

    // Monetary fields are untouched by lifecycle changes.
    assert_eq!(updated.order.total, created.order.total);
    assert_eq!(updated.order.total_profit, created.order.total_profit);
}

#[tokio::test]
async fn each_lifecycle_status_stamps_its_own_timestamp() {
    let app = TestApp::new().await;
    let created = seed_order(&app).await;
    let orders = &app.state.services.orders;

    let confirmed = orders
        .update_status(created.order.id, OrderStatus::Confirmed)
        .await
        .expect("confirm");
    assert!(confirmed.order.confirmed_at.is_some());

    let shipped = orders
        .update_status(created.order.id, OrderStatus::Shipped)
        .await
        .expect("ship");
    assert!(shipped.order.shipped_at.is_some());
    assert!(shipped.order.confirmed_at.is_some());

    let cancelled = orders
        .update_status(created.order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");
    assert!(cancelled.order.cancelled_at.is_some());
}

#[tokio::test]
async fn cancellation_does_not_restock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Vase", dec!(60), None, 4).await;

    let created = app
        .state
        .services
        .orders
        .create_order(CreateOrderInput {
            customer_name: "Nour H".to_string(),
            customer_phone: "0660123456".to_string(),
            customer_wilaya: None,
            customer_baladiya: None,
            customer_address: None,
            customer_email: None,
            items: vec![OrderLineInput {
                product_id: Some(product.id),
                variant_id: None,
                quantity: 3,
            }],
            delivery_fee: dec!(0),
            order_source: OrderSource::Website,
            created_by_id: None,
            notes: None,
        })
        .await
        .expect("seed order");

    app.state
        .services
        .orders
        .update_status(created.order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");

    let reloaded = app
        .state
        .services
        .catalog
        .get_product(product.id)
        .await
        .expect("reload product");
    assert_eq!(reloaded.product.stock_quantity, 1);
}

#[tokio::test]
async fn unknown_order_yields_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .orders
        .update_status(Uuid::new_v4(), OrderStatus::Confirmed)
        .await
        .expect_err("missing order");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn http_patch_status_round_trips() {
    let app = TestApp::new().await;
    let created = seed_order(&app).await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{}/status", created.order.id),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "delivered");
    assert!(json["data"]["delivered_at"].is_string());
}

#[tokio::test]
async fn http_unknown_status_maps_to_400() {
    let app = TestApp::new().await;
    let created = seed_order(&app).await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{}/status", created.order.id),
            Some(json!({ "status": "teleported" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_get_order_returns_items() {
    let app = TestApp::new().await;
    let created = seed_order(&app).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", created.order.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["data"]["id"], created.order.id.to_string());
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 1);
}
