use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::services::catalog::{CreateProductInput, CreateVariantInput};
use crate::{errors::ServiceError, ApiResponse, AppState};

#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created successfully"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    summary = "Get product",
    description = "Retrieve a product with its variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved successfully"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.catalog.get_product(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/variants",
    summary = "Create product variant",
    params(("id" = Uuid, Path, description = "Parent product ID")),
    request_body = CreateVariantInput,
    responses(
        (status = 201, description = "Variant created successfully"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state.services.catalog.create_variant(id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(variant))))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/breadcrumbs",
    summary = "Get category breadcrumbs",
    description = "Walk the parent chain from the category to the root, root first",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Breadcrumbs retrieved successfully"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn category_breadcrumbs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let chain = state.services.catalog.category_breadcrumbs(id).await?;
    Ok(Json(ApiResponse::success(chain)))
}
