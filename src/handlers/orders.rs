use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order::{OrderSource, OrderStatus, PaymentStatus};
use crate::services::orders::{CreateOrderInput, OrderFilters};
use crate::{errors::ServiceError, ApiResponse, AppState};

fn map_status_str(status: &str) -> Result<OrderStatus, ServiceError> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "confirmed" => Ok(OrderStatus::Confirmed),
        "processing" => Ok(OrderStatus::Processing),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        "refunded" => Ok(OrderStatus::Refunded),
        other => Err(ServiceError::InvalidInput(format!(
            "Unknown order status: {other}"
        ))),
    }
}

fn map_payment_status_str(status: &str) -> Result<PaymentStatus, ServiceError> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Ok(PaymentStatus::Pending),
        "paid" => Ok(PaymentStatus::Paid),
        "failed" => Ok(PaymentStatus::Failed),
        "refunded" => Ok(PaymentStatus::Refunded),
        other => Err(ServiceError::InvalidInput(format!(
            "Unknown payment status: {other}"
        ))),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// Acting staff member on the POS path, carried in the `X-Staff-Id` header.
/// Absent header means an anonymous terminal; a malformed value is rejected.
fn staff_id_from_headers(headers: &HeaderMap) -> Result<Option<Uuid>, ServiceError> {
    let Some(value) = headers.get("x-staff-id") else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| {
        ServiceError::InvalidInput("X-Staff-Id header is not valid UTF-8".to_string())
    })?;
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| ServiceError::InvalidInput(format!("Invalid staff id: {raw}")))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Atomically validate a cart, reserve stock and persist a new order",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created successfully"),
        (status = 400, description = "Invalid cart or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or variant", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.create_order(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/pos",
    summary = "Create POS order",
    description = "Create an order from the point-of-sale flow; the source is forced to pos and the acting staff member is recorded",
    request_body = CreateOrderInput,
    params(
        ("X-Staff-Id" = Option<Uuid>, Header, description = "Acting staff member id"),
    ),
    responses(
        (status = 201, description = "Order created successfully"),
        (status = 400, description = "Invalid cart, staff id or insufficient stock", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_pos_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.order_source = OrderSource::Pos;
    payload.created_by_id = staff_id_from_headers(&headers)?;
    let details = state.services.orders.create_order(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Paginated order listing with back-office filters",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("payment_status" = Option<String>, Query, description = "Filter by payment status"),
        ("from_date" = Option<String>, Query, description = "Created-at lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Created-at upper bound (RFC 3339)"),
        ("search" = Option<String>, Query, description = "Match order number, customer name, phone or email"),
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let filters = OrderFilters {
        status: params.status.as_deref().map(map_status_str).transpose()?,
        payment_status: params
            .payment_status
            .as_deref()
            .map(map_payment_status_str)
            .transpose()?,
        from_date: params.from_date,
        to_date: params.to_date,
        search: params.search,
    };
    let page = state
        .services
        .orders
        .list_orders(params.page, params.limit, filters)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    description = "Retrieve an order with its line items",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/status",
    summary = "Update order status",
    description = "Move an order to a new status, stamping the matching lifecycle timestamp",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated successfully"),
        (status = 400, description = "Unknown status value", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_status = map_status_str(&payload.status)?;
    let details = state.services.orders.update_status(id, new_status).await?;
    Ok(Json(ApiResponse::success(details)))
}
