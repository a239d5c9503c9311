use crate::{
    entities::{
        order::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
            OrderSource, OrderStatus, PaymentStatus,
        },
        order_item::{
            ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
            Model as OrderItemModel,
        },
        product::{self, Entity as ProductEntity},
        product_variant::{self, Entity as ProductVariantEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One submitted cart line. A line targets either a variant (which implies
/// its parent product) or a bare product.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderLineInput {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Item quantity must be a positive integer"))]
    pub quantity: i32,
}

/// Payload accepted by the order builder. Unknown fields are rejected rather
/// than silently forwarded into persistence.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, message = "customerName is required"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "customerPhone is required"))]
    pub customer_phone: String,
    pub customer_wilaya: Option<String>,
    pub customer_baladiya: Option<String>,
    pub customer_address: Option<String>,
    pub customer_email: Option<String>,
    #[validate(length(min = 1, message = "Cart items are required to create an order"))]
    pub items: Vec<OrderLineInput>,
    /// Accepted verbatim from the caller; no server-side rate table.
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[serde(default)]
    pub order_source: OrderSource,
    #[serde(skip)]
    pub created_by_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// A persisted order together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Filters for the back-office order listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    /// Matches order number, customer name, phone or email.
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderListPage {
    pub orders: Vec<OrderDetails>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// A resolved cart line with its priced amounts and captured snapshot.
struct ResolvedLine {
    product: product::Model,
    variant: Option<product_variant::Model>,
    quantity: i32,
    unit_price: Decimal,
    unit_cost: Decimal,
    line_total: Decimal,
    line_cost: Decimal,
    line_profit: Decimal,
}

/// Pending stock/metric mutations aggregated per pool so duplicate cart
/// lines hit each row exactly once.
#[derive(Default)]
struct PoolMutation {
    quantity: i32,
    revenue: Decimal,
    cost: Decimal,
    profit: Decimal,
    stock_decrement: i32,
}

/// Rounds a monetary amount to 2 decimal places, midpoint away from zero.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Generates a human-readable order number: millisecond timestamp plus a
/// random hex suffix so concurrent creations do not collide.
fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::random();
    format!("ORD-{}-{:04X}", millis, suffix)
}

/// Service owning order creation, retrieval, listing and the status state
/// machine. Constructed with an explicit database handle; there is no
/// ambient global client.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Atomically validates, prices and persists a new order: resolves each
    /// cart line against the catalog under row locks, checks stock, computes
    /// monetary totals, inserts the order and its items, and applies stock
    /// decrements and sales metrics. Either everything commits or nothing is
    /// visible.
    #[instrument(skip(self, input), fields(customer = %input.customer_name, lines = input.items.len()))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderDetails, ServiceError> {
        input.validate()?;

        for line in &input.items {
            line.validate()?;
            if line.product_id.is_none() && line.variant_id.is_none() {
                return Err(ServiceError::InvalidInput(
                    "Each cart line must reference a productId or a variantId".to_string(),
                ));
            }
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        // Commit and rollback are explicit, always-reached exit actions.
        let result = Self::build_order(&txn, &input).await;
        let details = match result {
            Ok(details) => {
                txn.commit().await.map_err(|e| {
                    error!(error = %e, "Failed to commit order creation transaction");
                    ServiceError::DatabaseError(e)
                })?;
                details
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back order creation transaction");
                }
                return Err(err);
            }
        };

        info!(
            order_id = %details.order.id,
            order_number = %details.order.order_number,
            total = %details.order.total,
            "Order created"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::OrderCreated(details.order.id)).await {
                warn!(error = %e, order_id = %details.order.id, "Failed to send order created event");
            }
        }

        Ok(details)
    }

    /// Transactional body of `create_order`. Every error return aborts the
    /// surrounding transaction before any write becomes visible.
    async fn build_order(
        txn: &DatabaseTransaction,
        input: &CreateOrderInput,
    ) -> Result<OrderDetails, ServiceError> {
        let now = Utc::now();

        let mut lines: Vec<ResolvedLine> = Vec::with_capacity(input.items.len());
        // Cumulative requested quantity per stock pool, so duplicate cart
        // lines against the same variant/product sum before the check.
        let mut requested: HashMap<Uuid, i32> = HashMap::new();

        let mut subtotal = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;

        for item in &input.items {
            let (product, variant) = if let Some(variant_id) = item.variant_id {
                let variant = ProductVariantEntity::find_by_id(variant_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::from_db_err)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product variant {} not found", variant_id))
                    })?;
                let product = ProductEntity::find_by_id(variant.product_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::from_db_err)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Product {} not found for variant {}",
                            variant.product_id, variant_id
                        ))
                    })?;
                (product, Some(variant))
            } else {
                let product_id = item.product_id.ok_or_else(|| {
                    ServiceError::InvalidInput(
                        "Each cart line must reference a productId or a variantId".to_string(),
                    )
                })?;
                let product = ProductEntity::find_by_id(product_id)
                    .lock_exclusive()
                    .one(txn)
                    .await
                    .map_err(ServiceError::from_db_err)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;
                (product, None)
            };

            // The stock pool is the variant when present, the product otherwise.
            let (pool_id, pool_stock) = match &variant {
                Some(v) => (v.id, v.stock_quantity),
                None => (product.id, product.stock_quantity),
            };
            let already = requested.entry(pool_id).or_insert(0);
            if pool_stock - *already < item.quantity {
                return Err(match &variant {
                    Some(v) => ServiceError::InsufficientStock(format!(
                        "Insufficient stock for variant {}",
                        v.id
                    )),
                    None => ServiceError::InsufficientStock(format!(
                        "Insufficient stock for product {}",
                        product.id
                    )),
                });
            }
            *already += item.quantity;

            let unit_price = variant.as_ref().map(|v| v.price).unwrap_or(product.price);
            let unit_cost = variant
                .as_ref()
                .and_then(|v| v.cost)
                .or(product.cost)
                .unwrap_or(Decimal::ZERO);

            let quantity_dec = Decimal::from(item.quantity);
            let line_total = round2(unit_price * quantity_dec);
            let line_cost = round2(unit_cost * quantity_dec);
            let line_profit = round2(line_total - line_cost);

            subtotal = round2(subtotal + line_total);
            total_cost = round2(total_cost + line_cost);

            lines.push(ResolvedLine {
                product,
                variant,
                quantity: item.quantity,
                unit_price,
                unit_cost,
                line_total,
                line_cost,
                line_profit,
            });
        }

        // No discount engine exists; the order-level discount is fixed at 0.
        let discount_amount = Decimal::ZERO;
        let total = round2(subtotal + input.delivery_fee - discount_amount);
        // Delivery fee is excluded from profit.
        let total_profit = round2(total - total_cost - input.delivery_fee);

        let order_id = Uuid::new_v4();
        let order = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(generate_order_number()),
            customer_name: Set(input.customer_name.clone()),
            customer_phone: Set(input.customer_phone.clone()),
            customer_wilaya: Set(input.customer_wilaya.clone()),
            customer_baladiya: Set(input.customer_baladiya.clone()),
            customer_address: Set(input.customer_address.clone()),
            customer_email: Set(input.customer_email.clone()),
            subtotal: Set(subtotal),
            delivery_fee: Set(input.delivery_fee),
            discount_amount: Set(discount_amount),
            total: Set(total),
            total_cost: Set(total_cost),
            total_profit: Set(total_profit),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            order_source: Set(input.order_source),
            notes: Set(input.notes.clone()),
            created_by_id: Set(input.created_by_id),
            confirmed_at: Set(None),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let order = order.insert(txn).await.map_err(ServiceError::from_db_err)?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product.id),
                variant_id: Set(line.variant.as_ref().map(|v| v.id)),
                product_name: Set(line.product.name.clone()),
                product_sku: Set(line
                    .variant
                    .as_ref()
                    .and_then(|v| v.sku_variant.clone())
                    .or_else(|| line.product.sku.clone())),
                selected_color: Set(line.variant.as_ref().and_then(|v| v.color.clone())),
                selected_size: Set(line.variant.as_ref().and_then(|v| v.size.clone())),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                unit_cost: Set(line.unit_cost),
                line_total: Set(line.line_total),
                line_cost: Set(line.line_cost),
                line_profit: Set(line.line_profit),
                created_at: Set(now),
            };
            items.push(item.insert(txn).await.map_err(ServiceError::from_db_err)?);
        }

        Self::apply_stock_and_metrics(txn, &lines, now).await?;

        Ok(OrderDetails { order, items })
    }

    /// Decrements stock and bumps the sales counters, one update per touched
    /// row. Variant lines decrement the variant's pool and still roll their
    /// quantity/revenue/cost/profit into the parent product's counters.
    async fn apply_stock_and_metrics(
        txn: &DatabaseTransaction,
        lines: &[ResolvedLine],
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut variant_muts: HashMap<Uuid, (product_variant::Model, PoolMutation)> =
            HashMap::new();
        let mut product_muts: HashMap<Uuid, (product::Model, PoolMutation)> = HashMap::new();

        for line in lines {
            if let Some(variant) = &line.variant {
                let entry = variant_muts
                    .entry(variant.id)
                    .or_insert_with(|| (variant.clone(), PoolMutation::default()));
                entry.1.quantity += line.quantity;
                entry.1.revenue += line.line_total;
                entry.1.stock_decrement += line.quantity;
            }

            let entry = product_muts
                .entry(line.product.id)
                .or_insert_with(|| (line.product.clone(), PoolMutation::default()));
            entry.1.quantity += line.quantity;
            entry.1.revenue += line.line_total;
            entry.1.cost += line.line_cost;
            entry.1.profit += line.line_profit;
            // Variants own their stock; only bare product lines decrement
            // the product's pool.
            if line.variant.is_none() {
                entry.1.stock_decrement += line.quantity;
            }
        }

        for (variant, m) in variant_muts.into_values() {
            let mut active: product_variant::ActiveModel = variant.clone().into();
            active.stock_quantity = Set(variant.stock_quantity - m.stock_decrement);
            active.sold_count = Set(variant.sold_count + m.quantity);
            active.revenue = Set(variant.revenue + m.revenue);
            active.updated_at = Set(Some(now));
            active.update(txn).await.map_err(ServiceError::from_db_err)?;
        }

        for (product, m) in product_muts.into_values() {
            let mut active: product::ActiveModel = product.clone().into();
            if m.stock_decrement > 0 {
                active.stock_quantity = Set(product.stock_quantity - m.stock_decrement);
            }
            active.sold_count = Set(product.sold_count + m.quantity);
            active.total_revenue = Set(product.total_revenue + m.revenue);
            active.total_cost = Set(product.total_cost + m.cost);
            active.total_profit = Set(product.total_profit + m.profit);
            active.updated_at = Set(Some(now));
            active.update(txn).await.map_err(ServiceError::from_db_err)?;
        }

        Ok(())
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order
            .find_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(OrderDetails { order, items })
    }

    /// Lists orders newest-first with back-office filters and pagination.
    #[instrument(skip(self, filters))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        filters: OrderFilters,
    ) -> Result<OrderListPage, ServiceError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let mut condition = Condition::all();
        if let Some(status) = filters.status {
            condition = condition.add(order::Column::Status.eq(status));
        }
        if let Some(payment_status) = filters.payment_status {
            condition = condition.add(order::Column::PaymentStatus.eq(payment_status));
        }
        if let Some(from) = filters.from_date {
            condition = condition.add(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filters.to_date {
            condition = condition.add(order::Column::CreatedAt.lte(to));
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(search))
                    .add(order::Column::CustomerName.contains(search))
                    .add(order::Column::CustomerPhone.contains(search))
                    .add(order::Column::CustomerEmail.contains(search)),
            );
        }

        let paginator = OrderEntity::find()
            .filter(condition)
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::from_db_err)?;
        let orders = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::from_db_err)?;

        let mut detailed = Vec::with_capacity(orders.len());
        for order in orders {
            let items = order
                .find_related(OrderItemEntity)
                .all(&*self.db)
                .await
                .map_err(ServiceError::from_db_err)?;
            detailed.push(OrderDetails { order, items });
        }

        Ok(OrderListPage {
            orders: detailed,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Moves an order to a new status, stamping the matching timestamp on
    /// entry into confirmed/shipped/delivered/cancelled. Transitions are
    /// deliberately permissive (no forward-only enforcement) and monetary
    /// fields are never touched; cancellation does not restock.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderDetails, ServiceError> {
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(ServiceError::DatabaseError)?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::from_db_err)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        match new_status {
            OrderStatus::Confirmed => active.confirmed_at = Set(Some(now)),
            OrderStatus::Shipped => active.shipped_at = Set(Some(now)),
            OrderStatus::Delivered => active.delivered_at = Set(Some(now)),
            OrderStatus::Cancelled => active.cancelled_at = Set(Some(now)),
            _ => {}
        }
        active.updated_at = Set(Some(now));

        let updated = active.update(&txn).await.map_err(ServiceError::from_db_err)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
            }
        }

        let items = updated
            .find_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from_db_err)?;

        Ok(OrderDetails {
            order: updated,
            items,
        })
    }
}
