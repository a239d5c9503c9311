use crate::{
    entities::{
        campaign::{
            self, ActiveModel as CampaignActiveModel, Entity as CampaignEntity,
            Model as CampaignModel,
        },
        campaign_product::{
            self, ActiveModel as CampaignProductActiveModel, Entity as CampaignProductEntity,
            Model as CampaignProductModel,
        },
        product::Entity as ProductEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignInput {
    #[validate(length(min = 1, message = "Campaign name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub cost: Decimal,
    pub budget: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub campaign_type: Option<String>,
    /// Products sharing the campaign cost. May be empty.
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(skip)]
    pub created_by_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignDetails {
    #[serde(flatten)]
    pub campaign: CampaignModel,
    pub products: Vec<CampaignProductModel>,
}

#[derive(Debug, Serialize)]
pub struct CampaignListPage {
    pub campaigns: Vec<CampaignModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Service owning marketing campaigns and their per-product cost allocation.
#[derive(Clone)]
pub struct CampaignService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl CampaignService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a campaign and links the given products, each carrying an
    /// even share of the campaign cost rounded to 2 decimal places. Header
    /// and links commit together; an unknown product id aborts everything.
    #[instrument(skip(self, input), fields(name = %input.name, products = input.product_ids.len()))]
    pub async fn create_campaign(
        &self,
        input: CreateCampaignInput,
    ) -> Result<CampaignDetails, ServiceError> {
        input.validate()?;

        if input.cost < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Campaign cost must not be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for campaign creation");
            ServiceError::DatabaseError(e)
        })?;

        let result = Self::build_campaign(&txn, &input).await;
        let details = match result {
            Ok(details) => {
                txn.commit().await.map_err(|e| {
                    error!(error = %e, "Failed to commit campaign creation transaction");
                    ServiceError::DatabaseError(e)
                })?;
                details
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back campaign creation transaction");
                }
                return Err(err);
            }
        };

        info!(
            campaign_id = %details.campaign.id,
            cost = %details.campaign.cost,
            linked_products = details.products.len(),
            "Campaign created"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::CampaignCreated(details.campaign.id)).await {
                warn!(error = %e, campaign_id = %details.campaign.id, "Failed to send campaign created event");
            }
        }

        Ok(details)
    }

    async fn build_campaign(
        txn: &DatabaseTransaction,
        input: &CreateCampaignInput,
    ) -> Result<CampaignDetails, ServiceError> {
        let now = Utc::now();
        let campaign_id = Uuid::new_v4();

        let campaign = CampaignActiveModel {
            id: Set(campaign_id),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            cost: Set(input.cost),
            budget: Set(input.budget),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            campaign_type: Set(input.campaign_type.clone()),
            is_active: Set(true),
            created_by_id: Set(input.created_by_id),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let campaign = campaign.insert(txn).await.map_err(ServiceError::from_db_err)?;

        let mut links = Vec::with_capacity(input.product_ids.len());
        if !input.product_ids.is_empty() {
            let share = round2(input.cost / Decimal::from(input.product_ids.len()));

            for product_id in &input.product_ids {
                // Foreign keys back this up, but an explicit lookup yields a
                // clean not-found instead of a driver-specific FK error.
                ProductEntity::find_by_id(*product_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::from_db_err)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;

                let link = CampaignProductActiveModel {
                    id: Set(Uuid::new_v4()),
                    campaign_id: Set(campaign_id),
                    product_id: Set(*product_id),
                    allocated_cost: Set(share),
                    created_at: Set(now),
                };
                links.push(link.insert(txn).await.map_err(ServiceError::from_db_err)?);
            }
        }

        Ok(CampaignDetails {
            campaign,
            products: links,
        })
    }

    /// Retrieves a campaign with its product allocations.
    #[instrument(skip(self), fields(campaign_id = %campaign_id))]
    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<CampaignDetails, ServiceError> {
        let campaign = CampaignEntity::find_by_id(campaign_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Campaign {} not found", campaign_id)))?;

        let products = campaign
            .find_related(CampaignProductEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(CampaignDetails { campaign, products })
    }

    /// Lists campaigns newest-first, optionally restricted to active ones.
    #[instrument(skip(self))]
    pub async fn list_campaigns(
        &self,
        page: u64,
        limit: u64,
        active_only: bool,
    ) -> Result<CampaignListPage, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let mut query = CampaignEntity::find().order_by_desc(campaign::Column::CreatedAt);
        if active_only {
            query = query.filter(campaign::Column::IsActive.eq(true));
        }

        let paginator = query.paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db_err)?;
        let campaigns = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(CampaignListPage {
            campaigns,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Per-product marketing spend: the sum of allocated costs across every
    /// campaign the product is linked to.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn allocated_cost_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let links = CampaignProductEntity::find()
            .filter(campaign_product::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(links.iter().map(|l| l.allocated_cost).sum())
    }
}
