use crate::{
    entities::{
        campaign::Entity as CampaignEntity,
        order::{self, Entity as OrderEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Back-office dashboard figures over an optional created-at window.
/// Campaign spend is all-time regardless of the window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub revenue: Decimal,
    pub orders_count: u64,
    pub campaign_spend: Decimal,
    pub net_profit: Decimal,
    pub delivery_fees: Decimal,
}

/// One day of sales, ascending by date in the returned series.
#[derive(Debug, Clone, Serialize)]
pub struct SalesPoint {
    pub date: NaiveDate,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductProfitability {
    pub id: Uuid,
    pub name: String,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    /// Profit as a percentage of revenue; absent while the product has no sales.
    pub profit_margin: Option<Decimal>,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn profit_margin(revenue: Decimal, profit: Decimal) -> Option<Decimal> {
    if revenue <= Decimal::ZERO {
        return None;
    }
    Some(round2(profit / revenue * Decimal::from(100)))
}

/// Read-only aggregation queries feeding the back-office dashboard.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Revenue, order count, delivery fees and net profit for the window,
    /// netted against all-time campaign spend:
    /// `net_profit = round2(revenue - total_cost - campaign_spend)`.
    #[instrument(skip(self))]
    pub async fn dashboard_stats(
        &self,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<DashboardStats, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(from) = from_date {
            query = query.filter(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = to_date {
            query = query.filter(order::Column::CreatedAt.lte(to));
        }
        let orders = query
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        let revenue: Decimal = orders.iter().map(|o| o.total).sum();
        let total_cost: Decimal = orders.iter().map(|o| o.total_cost).sum();
        let delivery_fees: Decimal = orders.iter().map(|o| o.delivery_fee).sum();

        let campaign_spend: Decimal = CampaignEntity::find()
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .iter()
            .map(|c| c.cost)
            .sum();

        Ok(DashboardStats {
            revenue,
            orders_count: orders.len() as u64,
            campaign_spend,
            net_profit: round2(revenue - total_cost - campaign_spend),
            delivery_fees,
        })
    }

    /// Daily order count and revenue over the trailing `days` window,
    /// oldest day first. Days without orders are omitted.
    #[instrument(skip(self))]
    pub async fn sales_over_time(&self, days: i64) -> Result<Vec<SalesPoint>, ServiceError> {
        let days = days.clamp(1, 365);
        let since = Utc::now() - Duration::days(days);

        let orders = OrderEntity::find()
            .filter(order::Column::CreatedAt.gte(since))
            .order_by_asc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        let mut buckets: BTreeMap<NaiveDate, (u64, Decimal)> = BTreeMap::new();
        for o in orders {
            let bucket = buckets.entry(o.created_at.date_naive()).or_default();
            bucket.0 += 1;
            bucket.1 += o.total;
        }

        Ok(buckets
            .into_iter()
            .map(|(date, (orders, revenue))| SalesPoint {
                date,
                orders,
                revenue,
            })
            .collect())
    }

    /// Top products by lifetime revenue, optionally restricted to a category.
    #[instrument(skip(self))]
    pub async fn product_profitability(
        &self,
        category_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<ProductProfitability>, ServiceError> {
        let limit = limit.clamp(1, 100);

        let mut query = ProductEntity::find()
            .order_by_desc(product::Column::TotalRevenue)
            .limit(limit);
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let products = query
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(products
            .into_iter()
            .map(|p| ProductProfitability {
                id: p.id,
                name: p.name,
                total_revenue: p.total_revenue,
                total_cost: p.total_cost,
                total_profit: p.total_profit,
                profit_margin: profit_margin(p.total_revenue, p.total_profit),
            })
            .collect())
    }
}
