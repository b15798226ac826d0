use crate::{
    db::DbPool,
    entities::dining_table::{
        self, ActiveModel as TableActiveModel, Entity as TableEntity, Model as TableModel,
        TableStatus,
    },
    entities::inventory_item::{self, Entity as InventoryItemEntity, Model as InventoryItemModel},
    entities::inventory_transaction::{
        ActiveModel as LedgerActiveModel, LedgerEntryType,
    },
    entities::menu_item_ingredient::{self, Entity as RecipeEntity, Model as RecipeModel},
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderStatus,
    },
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    entities::payment::{
        self, ActiveModel as PaymentActiveModel, Entity as PaymentEntity, Model as PaymentModel,
        PaymentMethod, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderResponse,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const HISTORY_LIMIT_CEILING: u64 = 500;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PaymentModel> for PaymentResponse {
    fn from(model: PaymentModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            payment_method: model.payment_method,
            status: model.status,
            transaction_id: model.transaction_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// One table's outstanding bill: its served orders and their pending
/// payments.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingBillResponse {
    pub table_id: Uuid,
    pub table_number: i32,
    pub orders: Vec<OrderResponse>,
    pub payments: Vec<PaymentResponse>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeasibilityWarning {
    pub inventory_item_id: Uuid,
    pub name: String,
    pub unit: String,
    pub required: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeasibilityResponse {
    pub table_id: Uuid,
    pub feasible: bool,
    pub warnings: Vec<FeasibilityWarning>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettleBillRequest {
    /// Discount percentage applied to every order on the bill, 0-100.
    #[serde(default)]
    pub discount_percent: Decimal,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    /// Operator override: proceed even when stock is insufficient, flooring
    /// on-hand quantities at zero.
    #[serde(default)]
    pub allow_insufficient_stock: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeductionSummary {
    pub inventory_item_id: Uuid,
    pub name: String,
    pub unit: String,
    pub deducted: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettlementResponse {
    pub table_id: Uuid,
    pub final_amount: Decimal,
    pub discount_percent: Decimal,
    pub payment_method: String,
    pub orders_paid: Vec<Uuid>,
    pub deductions: Vec<DeductionSummary>,
    pub warnings: Vec<FeasibilityWarning>,
}

/// Applies a percentage discount to one order total, rounded to two
/// decimal places, half away from zero. The bill-level final amount is
/// the sum of these per-order results.
pub fn apply_discount(total: Decimal, discount_percent: Decimal) -> Decimal {
    let discounted = total - total * discount_percent / Decimal::from(100);
    discounted.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Groups order lines by menu item, summing quantities. The same dish
/// ordered on several lines (or several orders) counts once with the
/// combined quantity.
pub fn aggregate_item_quantities(items: &[OrderItemModel]) -> HashMap<Uuid, i64> {
    let mut quantities: HashMap<Uuid, i64> = HashMap::new();
    for item in items {
        *quantities.entry(item.menu_item_id).or_insert(0) += i64::from(item.quantity);
    }
    quantities
}

/// Expands aggregated menu-item quantities through recipe rows into total
/// ingredient usage. Each ingredient accumulates exactly once across all
/// dishes that consume it.
pub fn accumulate_usage(
    quantities: &HashMap<Uuid, i64>,
    recipes: &[RecipeModel],
) -> HashMap<Uuid, Decimal> {
    let mut usage: HashMap<Uuid, Decimal> = HashMap::new();
    for recipe in recipes {
        if let Some(&qty) = quantities.get(&recipe.menu_item_id) {
            *usage.entry(recipe.inventory_item_id).or_insert(Decimal::ZERO) +=
                recipe.quantity_required * Decimal::from(qty);
        }
    }
    usage
}

/// Compares required usage against on-hand stock. The returned warnings
/// are sorted by ingredient name; an empty list means the bill is fully
/// coverable. The set flagged here is exactly the set settlement would
/// floor at zero.
pub fn feasibility_warnings(
    usage: &HashMap<Uuid, Decimal>,
    stock: &HashMap<Uuid, InventoryItemModel>,
) -> Result<Vec<FeasibilityWarning>, ServiceError> {
    let mut warnings = Vec::new();
    for (inventory_item_id, required) in usage {
        let item = stock.get(inventory_item_id).ok_or_else(|| {
            ServiceError::InternalError(format!(
                "recipe references missing inventory item {}",
                inventory_item_id
            ))
        })?;
        if item.quantity < *required {
            warnings.push(FeasibilityWarning {
                inventory_item_id: *inventory_item_id,
                name: item.name.clone(),
                unit: item.unit.clone(),
                required: *required,
                available: item.quantity,
            });
        }
    }
    warnings.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(warnings)
}

struct BillContext {
    table: TableModel,
    orders: Vec<OrderModel>,
    payments: Vec<PaymentModel>,
    usage: HashMap<Uuid, Decimal>,
    stock: HashMap<Uuid, InventoryItemModel>,
}

/// Claim on one table's settlement. Dropping it releases the table for
/// the next attempt, whether the settlement committed or failed.
pub struct SettlementGuard {
    locks: Arc<DashMap<Uuid, ()>>,
    table_id: Uuid,
}

impl Drop for SettlementGuard {
    fn drop(&mut self) {
        self.locks.remove(&self.table_id);
    }
}

/// Service for bill aggregation, feasibility checks and settlement.
#[derive(Clone)]
pub struct BillingService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    /// Per-table settlement locks. An occupied entry means a settlement is
    /// in flight for that table.
    settlement_locks: Arc<DashMap<Uuid, ()>>,
}

impl BillingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
            settlement_locks: Arc::new(DashMap::new()),
        }
    }

    /// Every bill-pending table with its served orders and pending
    /// payments. Tables with no pending payment row are excluded; the bill
    /// screen only shows work billing can act on.
    #[instrument(skip(self))]
    pub async fn pending_bills(&self) -> Result<Vec<PendingBillResponse>, ServiceError> {
        let tables = TableEntity::find()
            .filter(dining_table::Column::Status.eq(TableStatus::BillPending.as_str()))
            .order_by_asc(dining_table::Column::Number)
            .all(&*self.db_pool)
            .await?;

        let mut bills = Vec::new();
        for table in tables {
            let orders = OrderEntity::find()
                .filter(order::Column::TableId.eq(table.id))
                .filter(order::Column::Status.eq(OrderStatus::Served.as_str()))
                .order_by_asc(order::Column::CreatedAt)
                .all(&*self.db_pool)
                .await?;
            let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
            let payments = PaymentEntity::find()
                .filter(payment::Column::OrderId.is_in(order_ids))
                .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
                .all(&*self.db_pool)
                .await?;
            if payments.is_empty() {
                continue;
            }

            let billed: Vec<OrderModel> = orders
                .into_iter()
                .filter(|o| payments.iter().any(|p| p.order_id == o.id))
                .collect();
            let total_amount = billed.iter().map(|o| o.total).sum();

            bills.push(PendingBillResponse {
                table_id: table.id,
                table_number: table.number,
                orders: billed.into_iter().map(Into::into).collect(),
                payments: payments.into_iter().map(Into::into).collect(),
                total_amount,
            });
        }
        Ok(bills)
    }

    /// Completed payments, most recent first.
    #[instrument(skip(self))]
    pub async fn billing_history(
        &self,
        limit: u64,
    ) -> Result<Vec<PaymentResponse>, ServiceError> {
        let limit = limit.clamp(1, HISTORY_LIMIT_CEILING);
        let payments = PaymentEntity::find()
            .filter(payment::Column::Status.eq(PaymentStatus::Completed.as_str()))
            .order_by_desc(payment::Column::UpdatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    /// Advisory stock check for a table's pending bill. Never blocks
    /// settlement; the same aggregation runs again inside the settlement
    /// transaction.
    #[instrument(skip(self), fields(table_id = %table_id))]
    pub async fn check_feasibility(
        &self,
        table_id: Uuid,
    ) -> Result<FeasibilityResponse, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let ctx = self.load_bill(&txn, table_id).await?;
        txn.commit().await?;

        let warnings = feasibility_warnings(&ctx.usage, &ctx.stock)?;
        Ok(FeasibilityResponse {
            table_id,
            feasible: warnings.is_empty(),
            warnings,
        })
    }

    /// Settles a table's bill: completes payments, marks orders paid,
    /// deducts inventory and frees the table, all in one database
    /// transaction. A second settlement attempt for the same table while
    /// one is in flight is rejected with a conflict.
    #[instrument(skip(self, request), fields(table_id = %table_id))]
    pub async fn settle(
        &self,
        table_id: Uuid,
        request: SettleBillRequest,
    ) -> Result<SettlementResponse, ServiceError> {
        if request.discount_percent < Decimal::ZERO
            || request.discount_percent > Decimal::from(100)
        {
            return Err(ServiceError::ValidationError(
                "Discount percent must be between 0 and 100".to_string(),
            ));
        }

        let _guard = self.begin_settlement(table_id)?;
        self.settle_locked(table_id, request).await
    }

    /// Claims the per-table settlement lock. Fails when another settlement
    /// for the same table is already in flight.
    pub fn begin_settlement(&self, table_id: Uuid) -> Result<SettlementGuard, ServiceError> {
        match self.settlement_locks.entry(table_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ServiceError::ConcurrentModification(table_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(SettlementGuard {
                    locks: self.settlement_locks.clone(),
                    table_id,
                })
            }
        }
    }

    async fn settle_locked(
        &self,
        table_id: Uuid,
        request: SettleBillRequest,
    ) -> Result<SettlementResponse, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let ctx = self.load_bill(&txn, table_id).await?;

        // Stock check re-run inside the transaction; the advisory endpoint
        // may be stale by the time the operator confirms.
        let warnings = feasibility_warnings(&ctx.usage, &ctx.stock)?;
        if !warnings.is_empty() && !request.allow_insufficient_stock {
            let names: Vec<&str> = warnings.iter().map(|w| w.name.as_str()).collect();
            return Err(ServiceError::InsufficientStock(format!(
                "insufficient stock for: {}",
                names.join(", ")
            )));
        }

        // One floored decrement and one usage ledger row per ingredient.
        let mut deductions = Vec::with_capacity(ctx.usage.len());
        for (inventory_item_id, used) in &ctx.usage {
            if used.is_zero() {
                continue;
            }
            let item = &ctx.stock[inventory_item_id];

            InventoryItemEntity::update_many()
                .col_expr(
                    inventory_item::Column::Quantity,
                    Expr::cust_with_values(
                        "CASE WHEN quantity >= ? THEN quantity - ? ELSE 0 END",
                        [*used, *used],
                    ),
                )
                .filter(inventory_item::Column::Id.eq(*inventory_item_id))
                .exec(&txn)
                .await?;

            let previous = item.quantity;
            let remaining = (previous - *used).max(Decimal::ZERO);
            LedgerActiveModel {
                id: Set(Uuid::new_v4()),
                inventory_item_id: Set(*inventory_item_id),
                transaction_type: Set(LedgerEntryType::Usage.as_str().to_string()),
                quantity: Set(*used),
                previous_quantity: Set(previous),
                new_quantity: Set(remaining),
                notes: Set(Some(format!(
                    "Settlement for table {}",
                    ctx.table.number
                ))),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            deductions.push(DeductionSummary {
                inventory_item_id: *inventory_item_id,
                name: item.name.clone(),
                unit: item.unit.clone(),
                deducted: *used,
                remaining,
            });
        }
        deductions.sort_by(|a, b| a.name.cmp(&b.name));

        // Complete each pending payment and mark its order paid, each at
        // the order's independently discounted total.
        let mut final_amount = Decimal::ZERO;
        let mut orders_paid = Vec::with_capacity(ctx.orders.len());
        let mut completed_payments = Vec::new();
        for order in &ctx.orders {
            let discounted = apply_discount(order.total, request.discount_percent);
            final_amount += discounted;
            orders_paid.push(order.id);

            let payment = ctx
                .payments
                .iter()
                .find(|p| p.order_id == order.id)
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "order {} lost its pending payment mid-settlement",
                        order.id
                    ))
                })?;
            let mut payment_active: PaymentActiveModel = payment.clone().into();
            payment_active.amount = Set(discounted);
            payment_active.payment_method = Set(request.payment_method.as_str().to_string());
            payment_active.status = Set(PaymentStatus::Completed.as_str().to_string());
            payment_active.transaction_id = Set(request.transaction_id.clone());
            payment_active.update(&txn).await?;
            completed_payments.push((payment.id, order.id, discounted));

            let mut order_active: OrderActiveModel = order.clone().into();
            order_active.status = Set(OrderStatus::Paid.as_str().to_string());
            order_active.discount = Set(request.discount_percent);
            order_active.total = Set(discounted);
            order_active.payment_method = Set(Some(request.payment_method.as_str().to_string()));
            order_active.update(&txn).await?;
        }

        let old_table_status = ctx.table.status.clone();
        let mut table_active: TableActiveModel = ctx.table.clone().into();
        table_active.status = Set(TableStatus::Free.as_str().to_string());
        table_active.update(&txn).await?;

        txn.commit().await?;

        info!(
            %table_id,
            %final_amount,
            orders = orders_paid.len(),
            ingredients = deductions.len(),
            "bill settled"
        );

        self.publish_settlement_events(
            table_id,
            &old_table_status,
            &request,
            &ctx,
            &completed_payments,
            &deductions,
        )
        .await;

        Ok(SettlementResponse {
            table_id,
            final_amount,
            discount_percent: request.discount_percent,
            payment_method: request.payment_method.as_str().to_string(),
            orders_paid,
            deductions,
            warnings,
        })
    }

    async fn publish_settlement_events(
        &self,
        table_id: Uuid,
        old_table_status: &str,
        request: &SettleBillRequest,
        ctx: &BillContext,
        completed_payments: &[(Uuid, Uuid, Decimal)],
        deductions: &[DeductionSummary],
    ) {
        let Some(sender) = &self.event_sender else {
            return;
        };

        for (payment_id, order_id, amount) in completed_payments {
            if let Err(e) = sender
                .send(Event::PaymentCompleted {
                    payment_id: *payment_id,
                    order_id: *order_id,
                    amount: *amount,
                    payment_method: request.payment_method.as_str().to_string(),
                })
                .await
            {
                warn!(error = %e, "failed to publish payment event");
            }
        }
        for order in &ctx.orders {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id: order.id,
                    old_status: order.status.clone(),
                    new_status: OrderStatus::Paid.as_str().to_string(),
                })
                .await
            {
                warn!(error = %e, "failed to publish order status event");
            }
        }
        if let Err(e) = sender
            .send(Event::TableStatusChanged {
                table_id,
                old_status: old_table_status.to_string(),
                new_status: TableStatus::Free.as_str().to_string(),
            })
            .await
        {
            warn!(error = %e, "failed to publish table status event");
        }
        for deduction in deductions {
            if let Err(e) = sender
                .send(Event::InventoryDeducted {
                    inventory_item_id: deduction.inventory_item_id,
                    quantity: deduction.deducted,
                    remaining: deduction.remaining,
                })
                .await
            {
                warn!(error = %e, "failed to publish deduction event");
            }
            let item = &ctx.stock[&deduction.inventory_item_id];
            let was_low = item.quantity <= item.restock_threshold;
            if !was_low && deduction.remaining <= item.restock_threshold {
                if let Err(e) = sender
                    .send(Event::LowStock {
                        inventory_item_id: deduction.inventory_item_id,
                        name: item.name.clone(),
                        quantity: deduction.remaining,
                        restock_threshold: item.restock_threshold,
                        timestamp: Utc::now(),
                    })
                    .await
                {
                    warn!(error = %e, "failed to publish low stock event");
                }
            }
        }
    }

    /// Loads the full billing context for a table inside a transaction:
    /// the bill-pending table, its served orders carrying pending
    /// payments, the aggregated ingredient usage, and the stock rows the
    /// usage touches. A recipe referencing a missing inventory item is an
    /// error, never a silent skip.
    async fn load_bill(
        &self,
        txn: &DatabaseTransaction,
        table_id: Uuid,
    ) -> Result<BillContext, ServiceError> {
        let table = TableEntity::find_by_id(table_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Table with ID {} not found", table_id))
            })?;
        if table.status() != Some(TableStatus::BillPending) {
            return Err(ServiceError::InvalidOperation(format!(
                "table {} has no bill awaiting settlement",
                table.number
            )));
        }

        let served_orders = OrderEntity::find()
            .filter(order::Column::TableId.eq(table_id))
            .filter(order::Column::Status.eq(OrderStatus::Served.as_str()))
            .order_by_asc(order::Column::CreatedAt)
            .all(txn)
            .await?;
        let order_ids: Vec<Uuid> = served_orders.iter().map(|o| o.id).collect();
        let payments = PaymentEntity::find()
            .filter(payment::Column::OrderId.is_in(order_ids.clone()))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .all(txn)
            .await?;

        let orders: Vec<OrderModel> = served_orders
            .into_iter()
            .filter(|o| payments.iter().any(|p| p.order_id == o.id))
            .collect();
        if orders.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "table {} has no pending payments to settle",
                table.number
            )));
        }

        let billed_order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(billed_order_ids))
            .all(txn)
            .await?;
        let quantities = aggregate_item_quantities(&items);

        let menu_item_ids: Vec<Uuid> = quantities.keys().copied().collect();
        let recipes = RecipeEntity::find()
            .filter(menu_item_ingredient::Column::MenuItemId.is_in(menu_item_ids))
            .all(txn)
            .await?;
        let usage = accumulate_usage(&quantities, &recipes);

        let ingredient_ids: Vec<Uuid> = usage.keys().copied().collect();
        let stock: HashMap<Uuid, InventoryItemModel> = InventoryItemEntity::find()
            .filter(inventory_item::Column::Id.is_in(ingredient_ids))
            .all(txn)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        Ok(BillContext {
            table,
            orders,
            payments,
            usage,
            stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_item(menu_item_id: Uuid, quantity: i32) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            menu_item_id,
            quantity,
            price: dec!(100),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn recipe(menu_item_id: Uuid, inventory_item_id: Uuid, required: Decimal) -> RecipeModel {
        RecipeModel {
            id: Uuid::new_v4(),
            menu_item_id,
            inventory_item_id,
            quantity_required: required,
            created_at: Utc::now(),
        }
    }

    fn stock_item(id: Uuid, name: &str, quantity: Decimal, threshold: Decimal) -> InventoryItemModel {
        InventoryItemModel {
            id,
            name: name.to_string(),
            category_id: Uuid::new_v4(),
            quantity,
            unit: "g".to_string(),
            restock_threshold: threshold,
            price: dec!(1),
            expiry_date: None,
            last_restocked: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn discount_rounds_half_away_from_zero() {
        assert_eq!(apply_discount(dec!(200.00), dec!(0)), dec!(200.00));
        assert_eq!(apply_discount(dec!(200.00), dec!(10)), dec!(180.00));
        // 333.33 * 15% = 49.9995 off -> 283.3305 -> 283.33
        assert_eq!(apply_discount(dec!(333.33), dec!(15)), dec!(283.33));
        // 0.125 midpoint rounds away from zero
        assert_eq!(apply_discount(dec!(0.25), dec!(50)), dec!(0.13));
        assert_eq!(apply_discount(dec!(99.99), dec!(100)), dec!(0.00));
    }

    #[test]
    fn same_dish_on_multiple_lines_aggregates_once() {
        let dish = Uuid::new_v4();
        let items = vec![order_item(dish, 2), order_item(dish, 3)];
        let quantities = aggregate_item_quantities(&items);
        assert_eq!(quantities.len(), 1);
        assert_eq!(quantities[&dish], 5);

        let paneer = Uuid::new_v4();
        let usage = accumulate_usage(&quantities, &[recipe(dish, paneer, dec!(80))]);
        assert_eq!(usage[&paneer], dec!(400));
    }

    #[test]
    fn shared_ingredient_sums_across_dishes() {
        let curry = Uuid::new_v4();
        let naan = Uuid::new_v4();
        let flour = Uuid::new_v4();
        let items = vec![order_item(curry, 2), order_item(naan, 4)];
        let quantities = aggregate_item_quantities(&items);

        let recipes = vec![
            recipe(curry, flour, dec!(40)),
            recipe(naan, flour, dec!(40)),
        ];
        let usage = accumulate_usage(&quantities, &recipes);
        // 2*40 + 4*40 in one combined entry
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[&flour], dec!(240));
    }

    #[test]
    fn dishes_without_recipes_contribute_nothing() {
        let dish = Uuid::new_v4();
        let quantities = HashMap::from([(dish, 3_i64)]);
        let usage = accumulate_usage(&quantities, &[]);
        assert!(usage.is_empty());
    }

    #[test]
    fn warnings_flag_exactly_the_shortfall_set() {
        let paneer = Uuid::new_v4();
        let cream = Uuid::new_v4();
        let usage = HashMap::from([(paneer, dec!(400)), (cream, dec!(100))]);
        let stock = HashMap::from([
            (paneer, stock_item(paneer, "Paneer", dec!(300), dec!(50))),
            (cream, stock_item(cream, "Cream", dec!(150), dec!(50))),
        ]);

        let warnings = feasibility_warnings(&usage, &stock).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].name, "Paneer");
        assert_eq!(warnings[0].required, dec!(400));
        assert_eq!(warnings[0].available, dec!(300));
    }

    #[test]
    fn exact_stock_is_feasible() {
        let paneer = Uuid::new_v4();
        let usage = HashMap::from([(paneer, dec!(400))]);
        let stock = HashMap::from([(paneer, stock_item(paneer, "Paneer", dec!(400), dec!(50)))]);
        assert!(feasibility_warnings(&usage, &stock).unwrap().is_empty());
    }

    #[test]
    fn settlement_lock_is_exclusive_per_table_and_released_on_drop() {
        let service = BillingService::new(Arc::new(DbPool::default()), None);
        let table = Uuid::new_v4();

        let guard = service.begin_settlement(table).unwrap();
        assert!(matches!(
            service.begin_settlement(table),
            Err(ServiceError::ConcurrentModification(id)) if id == table
        ));
        // Other tables settle independently of the held lock.
        let _other = service.begin_settlement(Uuid::new_v4()).unwrap();

        drop(guard);
        assert!(service.begin_settlement(table).is_ok());
    }

    #[test]
    fn missing_stock_row_is_an_error_not_a_skip() {
        let ghost = Uuid::new_v4();
        let usage = HashMap::from([(ghost, dec!(10))]);
        let stock = HashMap::new();
        assert!(matches!(
            feasibility_warnings(&usage, &stock),
            Err(ServiceError::InternalError(_))
        ));
    }
}
