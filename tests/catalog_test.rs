mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{errors::ServiceError, services::catalog::CreateProductInput};
use uuid::Uuid;

#[tokio::test]
async fn breadcrumbs_walk_parent_chain_root_first() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let root = catalog
        .create_category("Clothing".to_string(), "clothing".to_string(), None)
        .await
        .expect("root category");
    let mid = catalog
        .create_category("Men".to_string(), "men".to_string(), Some(root.id))
        .await
        .expect("mid category");
    let leaf = catalog
        .create_category("Shirts".to_string(), "shirts".to_string(), Some(mid.id))
        .await
        .expect("leaf category");

    let chain = catalog
        .category_breadcrumbs(leaf.id)
        .await
        .expect("breadcrumbs");
    let slugs: Vec<&str> = chain.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, ["clothing", "men", "shirts"]);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/categories/{}/breadcrumbs", leaf.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn breadcrumbs_for_unknown_category_yield_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .catalog
        .category_breadcrumbs(Uuid::new_v4())
        .await
        .expect_err("missing category");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn category_stats_track_product_count_and_price_range() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let category = catalog
        .create_category("Bags".to_string(), "bags".to_string(), None)
        .await
        .expect("category");

    for (name, price) in [("Tote", dec!(45)), ("Backpack", dec!(120))] {
        catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                slug: format!("{}-{}", name.to_lowercase(), Uuid::new_v4().simple()),
                description: None,
                sku: None,
                price,
                cost: None,
                stock_quantity: 10,
                category_id: Some(category.id),
            })
            .await
            .expect("product in category");
    }

    let chain = catalog
        .category_breadcrumbs(category.id)
        .await
        .expect("reload category");
    let reloaded = chain.last().expect("category present");
    assert_eq!(reloaded.product_count, 2);
    assert_eq!(reloaded.min_price, Some(dec!(45)));
    assert_eq!(reloaded.max_price, Some(dec!(120)));
}

#[tokio::test]
async fn http_product_lifecycle() {
    let app = TestApp::new().await;

    let body = json!({
        "name": "Scarf",
        "slug": "scarf",
        "price": "35",
        "cost": "12",
        "stock_quantity": 8,
    });
    let response = app
        .request(Method::POST, "/api/v1/products", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    let id = json["data"]["id"].as_str().expect("product id").to_string();

    let body = json!({
        "color": "red",
        "size": "L",
        "price": "38",
        "stock_quantity": 3,
    });
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{id}/variants"),
            Some(body),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"]["variants"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["is_active"], true);
}

#[tokio::test]
async fn http_duplicate_slug_maps_to_409() {
    let app = TestApp::new().await;

    let body = json!({
        "name": "Belt",
        "slug": "belt",
        "price": "20",
    });
    let response = app
        .request(Method::POST, "/api/v1/products", Some(body.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/v1/products", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
