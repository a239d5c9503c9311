use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::campaigns::CreateCampaignInput;
use crate::{errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CampaignListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub active_only: bool,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[utoipa::path(
    post,
    path = "/api/v1/campaigns",
    summary = "Create campaign",
    description = "Create a marketing campaign and evenly allocate its cost across the linked products",
    request_body = CreateCampaignInput,
    responses(
        (status = 201, description = "Campaign created successfully"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Linked product not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(payload): Json<CreateCampaignInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.campaigns.create_campaign(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(details))))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    summary = "List campaigns",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("active_only" = Option<bool>, Query, description = "Only active campaigns"),
    ),
    responses((status = 200, description = "Campaigns retrieved successfully"))
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(params): Query<CampaignListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state
        .services
        .campaigns
        .list_campaigns(params.page, params.limit, params.active_only)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}",
    summary = "Get campaign",
    description = "Retrieve a campaign with its product cost allocations",
    params(("id" = Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign retrieved successfully"),
        (status = 404, description = "Campaign not found", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.campaigns.get_campaign(id).await?;
    Ok(Json(ApiResponse::success(details)))
}
