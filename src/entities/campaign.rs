use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Marketing campaign header. Linked products carry an even share of the
/// campaign cost in `campaign_products.allocated_cost`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub budget: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub end_date: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub campaign_type: Option<String>,
    pub is_active: bool,
    #[sea_orm(nullable)]
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::campaign_product::Entity")]
    CampaignProducts,
}

impl Related<super::campaign_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CampaignProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
