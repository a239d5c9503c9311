mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use storefront_api::{
    entities::campaign::Entity as CampaignEntity,
    errors::ServiceError,
    services::campaigns::CreateCampaignInput,
};
use uuid::Uuid;

fn campaign_input(cost: rust_decimal::Decimal, product_ids: Vec<Uuid>) -> CreateCampaignInput {
    CreateCampaignInput {
        name: "Summer push".to_string(),
        description: None,
        cost,
        budget: None,
        start_date: Utc::now(),
        end_date: None,
        campaign_type: Some("social".to_string()),
        product_ids,
        created_by_id: None,
    }
}

#[tokio::test]
async fn cost_splits_evenly_across_linked_products() {
    let app = TestApp::new().await;
    let mut ids = Vec::new();
    for name in ["A", "B", "C"] {
        ids.push(app.seed_product(name, dec!(10), None, 5).await.id);
    }

    let details = app
        .state
        .services
        .campaigns
        .create_campaign(campaign_input(dec!(300), ids.clone()))
        .await
        .expect("campaign created");

    assert_eq!(details.products.len(), 3);
    for link in &details.products {
        assert_eq!(link.allocated_cost, dec!(100.00));
        assert!(ids.contains(&link.product_id));
    }
}

#[tokio::test]
async fn uneven_split_rounds_each_share_to_cents() {
    let app = TestApp::new().await;
    let mut ids = Vec::new();
    for name in ["D", "E", "F"] {
        ids.push(app.seed_product(name, dec!(10), None, 5).await.id);
    }

    let details = app
        .state
        .services
        .campaigns
        .create_campaign(campaign_input(dec!(100), ids))
        .await
        .expect("campaign created");

    for link in &details.products {
        assert_eq!(link.allocated_cost, dec!(33.33));
    }
}

#[tokio::test]
async fn unknown_product_rolls_back_header_and_links() {
    let app = TestApp::new().await;
    let real = app.seed_product("Real", dec!(10), None, 5).await;

    let err = app
        .state
        .services
        .campaigns
        .create_campaign(campaign_input(dec!(200), vec![real.id, Uuid::new_v4()]))
        .await
        .expect_err("campaign should be rejected");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let count = CampaignEntity::find()
        .count(&*app.state.db)
        .await
        .expect("count campaigns");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn campaign_without_products_creates_header_only() {
    let app = TestApp::new().await;

    let details = app
        .state
        .services
        .campaigns
        .create_campaign(campaign_input(dec!(50), vec![]))
        .await
        .expect("campaign created");

    assert!(details.products.is_empty());
    assert!(details.campaign.is_active);
}

#[tokio::test]
async fn allocated_cost_sums_across_campaigns() {
    let app = TestApp::new().await;
    let product = app.seed_product("Star", dec!(10), None, 5).await;

    for cost in [dec!(100), dec!(50)] {
        app.state
            .services
            .campaigns
            .create_campaign(campaign_input(cost, vec![product.id]))
            .await
            .expect("campaign created");
    }

    let spend = app
        .state
        .services
        .campaigns
        .allocated_cost_for_product(product.id)
        .await
        .expect("allocated spend");
    assert_eq!(spend, dec!(150.00));
}

#[tokio::test]
async fn http_create_and_get_campaign() {
    let app = TestApp::new().await;
    let product = app.seed_product("Promo", dec!(10), None, 5).await;

    let body = json!({
        "name": "Autumn push",
        "cost": "90",
        "start_date": Utc::now().to_rfc3339(),
        "product_ids": [product.id],
    });

    let response = app
        .request(Method::POST, "/api/v1/campaigns", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = response_json(response).await;
    let id = json["data"]["id"].as_str().expect("campaign id").to_string();

    let response = app
        .request(Method::GET, &format!("/api/v1/campaigns/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"]["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn http_negative_cost_maps_to_400() {
    let app = TestApp::new().await;

    let body = json!({
        "name": "Bad",
        "cost": "-5",
        "start_date": Utc::now().to_rfc3339(),
    });

    let response = app
        .request(Method::POST, "/api/v1/campaigns", Some(body))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
