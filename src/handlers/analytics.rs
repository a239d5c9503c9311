use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DashboardParams {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalesOverTimeParams {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfitabilityParams {
    pub category_id: Option<Uuid>,
    #[serde(default = "default_profitability_limit")]
    pub limit: u64,
}

fn default_profitability_limit() -> u64 {
    50
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    summary = "Dashboard stats",
    description = "Revenue, order count, delivery fees, campaign spend and net profit",
    params(
        ("from_date" = Option<String>, Query, description = "Created-at lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Created-at upper bound (RFC 3339)"),
    ),
    responses(
        (status = 200, description = "Dashboard stats retrieved successfully")
    )
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state
        .services
        .analytics
        .dashboard_stats(params.from_date, params.to_date)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/sales-over-time",
    summary = "Sales over time",
    description = "Daily order count and revenue over the trailing window",
    params(
        ("days" = Option<i64>, Query, description = "Window size in days (default: 30, max: 365)"),
    ),
    responses(
        (status = 200, description = "Sales series retrieved successfully")
    )
)]
pub async fn sales_over_time(
    State(state): State<AppState>,
    Query(params): Query<SalesOverTimeParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let series = state.services.analytics.sales_over_time(params.days).await?;
    Ok(Json(ApiResponse::success(series)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/product-profitability",
    summary = "Product profitability",
    description = "Top products by lifetime revenue with cost, profit and margin",
    params(
        ("category_id" = Option<Uuid>, Query, description = "Restrict to a category"),
        ("limit" = Option<u64>, Query, description = "Maximum products returned (default: 50, max: 100)"),
    ),
    responses(
        (status = 200, description = "Profitability rows retrieved successfully")
    )
)]
pub async fn product_profitability(
    State(state): State<AppState>,
    Query(params): Query<ProfitabilityParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let rows = state
        .services
        .analytics
        .product_profitability(params.category_id, params.limit)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
