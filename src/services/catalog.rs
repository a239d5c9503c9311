use crate::{
    entities::{
        category::{self, Entity as CategoryEntity, Model as CategoryModel},
        product::{
            self, ActiveModel as ProductActiveModel, Entity as ProductEntity,
            Model as ProductModel,
        },
        product_variant::{
            ActiveModel as VariantActiveModel, Entity as VariantEntity, Model as VariantModel,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProductInput {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Product slug is required"))]
    pub slug: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateVariantInput {
    pub sku_variant: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: ProductModel,
    pub variants: Vec<VariantModel>,
}

/// Catalog management: products, variants and category maintenance. Stock
/// decrements and sales counters belong to the order builder, not here.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name, slug = %input.slug))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        if input.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Product price must not be negative".to_string(),
            ));
        }
        if input.stock_quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Stock quantity must not be negative".to_string(),
            ));
        }

        if let Some(category_id) = input.category_id {
            CategoryEntity::find_by_id(category_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::from_db_err)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let now = Utc::now();
        let model = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            sku: Set(input.sku),
            price: Set(input.price),
            cost: Set(input.cost),
            stock_quantity: Set(input.stock_quantity),
            is_active: Set(true),
            category_id: Set(input.category_id),
            sold_count: Set(0),
            total_revenue: Set(Decimal::ZERO),
            total_cost: Set(Decimal::ZERO),
            total_profit: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        info!(product_id = %created.id, "Product created");

        if let Some(category_id) = created.category_id {
            self.refresh_category_stats(category_id).await?;
        }

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::ProductCreated(created.id)).await {
                warn!(error = %e, product_id = %created.id, "Failed to send product created event");
            }
        }

        Ok(created)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetails, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variants = product
            .find_related(VariantEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(ProductDetails { product, variants })
    }

    #[instrument(skip(self, input), fields(product_id = %product_id))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<VariantModel, ServiceError> {
        input.validate()?;

        if input.stock_quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Stock quantity must not be negative".to_string(),
            ));
        }

        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let now = Utc::now();
        let model = VariantActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            sku_variant: Set(input.sku_variant),
            color: Set(input.color),
            size: Set(input.size),
            price: Set(input.price),
            cost: Set(input.cost),
            stock_quantity: Set(input.stock_quantity),
            sold_count: Set(0),
            revenue: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        info!(variant_id = %created.id, product_id = %product_id, "Product variant created");

        Ok(created)
    }

    /// Walks the parent chain from the category to the root. Returned root
    /// first, the requested category last.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn category_breadcrumbs(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<CategoryModel>, ServiceError> {
        let mut chain = Vec::new();
        let mut cursor = Some(category_id);

        while let Some(id) = cursor {
            // Self-referencing parent ids cannot recurse forever.
            if chain.iter().any(|c: &CategoryModel| c.id == id) {
                warn!(category_id = %id, "Cycle detected in category parent chain");
                break;
            }
            let category = CategoryEntity::find_by_id(id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::from_db_err)?
                .ok_or_else(|| {
                    if chain.is_empty() {
                        ServiceError::NotFound(format!("Category {} not found", id))
                    } else {
                        ServiceError::InternalError(format!(
                            "Category parent chain references missing category {}",
                            id
                        ))
                    }
                })?;
            cursor = category.parent_id;
            chain.push(category);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Recomputes the category's denormalized product_count and price range
    /// from its active products.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn refresh_category_stats(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let category = CategoryEntity::find_by_id(category_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))?;

        let products = ProductEntity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .filter(product::Column::IsActive.eq(true))
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        let min_price = products.iter().map(|p| p.price).min();
        let max_price = products.iter().map(|p| p.price).max();

        let mut active: category::ActiveModel = category.into();
        active.product_count = Set(products.len() as i32);
        active.min_price = Set(min_price);
        active.max_price = Set(max_price);
        active.updated_at = Set(Some(Utc::now()));
        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(())
    }

    #[instrument(skip(self), fields(name = %name, slug = %slug))]
    pub async fn create_category(
        &self,
        name: String,
        slug: String,
        parent_id: Option<Uuid>,
    ) -> Result<CategoryModel, ServiceError> {
        if name.trim().is_empty() || slug.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Category name and slug are required".to_string(),
            ));
        }

        if let Some(parent_id) = parent_id {
            CategoryEntity::find_by_id(parent_id)
                .one(&*self.db)
                .await
                .map_err(ServiceError::from_db_err)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", parent_id))
                })?;
        }

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            parent_id: Set(parent_id),
            product_count: Set(0),
            min_price: Set(None),
            max_price: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)
    }
}
