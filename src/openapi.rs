use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront Order Management API

Back-office API for an e-commerce storefront: order building with atomic stock
reservation, order lifecycle tracking, marketing campaign cost allocation and
light catalog management.

## Error Handling

Errors use a consistent JSON body with appropriate HTTP status codes:

```json
{
  "error": "Bad Request",
  "message": "Insufficient stock for product ...",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints take `page` (default: 1) and `limit` (default: 20, max: 100).
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order building and lifecycle endpoints"),
        (name = "Campaigns", description = "Marketing campaign endpoints"),
        (name = "Catalog", description = "Product and category endpoints"),
        (name = "Analytics", description = "Dashboard aggregation endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::create_pos_order,
        crate::handlers::orders::update_order_status,

        // Campaigns
        crate::handlers::campaigns::list_campaigns,
        crate::handlers::campaigns::get_campaign,
        crate::handlers::campaigns::create_campaign,

        // Catalog
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::create_variant,
        crate::handlers::products::category_breadcrumbs,

        // Analytics
        crate::handlers::analytics::dashboard_stats,
        crate::handlers::analytics::sales_over_time,
        crate::handlers::analytics::product_profitability,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Order types
            crate::services::orders::CreateOrderInput,
            crate::services::orders::OrderLineInput,
            crate::handlers::orders::UpdateOrderStatusRequest,

            // Campaign types
            crate::services::campaigns::CreateCampaignInput,

            // Catalog types
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::CreateVariantInput,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let doc = ApiDocV1::openapi();
        let json = serde_json::to_string(&doc).expect("openapi document should serialize");
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/campaigns"));
    }
}
