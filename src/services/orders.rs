use crate::{
    db::DbPool,
    entities::dining_table::{
        self, ActiveModel as TableActiveModel, Entity as TableEntity, TableStatus,
    },
    entities::menu_item::{self, Entity as MenuItemEntity},
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderStatus,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    entities::payment::{
        self, ActiveModel as PaymentActiveModel, Entity as PaymentEntity, PaymentStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub table_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: i32,
    /// Unit price captured when the order was placed.
    pub price: Decimal,
    pub notes: Option<String>,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            menu_item_id: model.menu_item_id,
            quantity: model.quantity,
            price: model.price,
            notes: model.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub table_id: Uuid,
    pub status: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OrderModel> for OrderResponse {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            table_id: model.table_id,
            status: model.status,
            subtotal: model.subtotal,
            discount: model.discount,
            total: model.total,
            payment_method: model.payment_method,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendToBillingResponse {
    pub table_id: Uuid,
    /// Orders that now carry a pending payment, including previously sent
    /// ones on a retried request.
    pub order_ids: Vec<Uuid>,
    pub total_amount: Decimal,
}

/// Service for order intake and kitchen progression.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates an order with its line items in one transaction, snapshotting
    /// each menu item's current price. The table moves to occupied.
    #[instrument(skip(self, request), fields(table_id = %request.table_id, item_count = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetailResponse, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;

        let table = TableEntity::find_by_id(request.table_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Table with ID {} not found", request.table_id))
            })?;
        let table_status = table.status().ok_or_else(|| {
            ServiceError::InternalError(format!("table {} has malformed status", table.id))
        })?;
        if table_status == TableStatus::BillPending {
            return Err(ServiceError::InvalidOperation(format!(
                "table {} is awaiting settlement, no new orders can be taken",
                table.number
            )));
        }

        // Resolve menu items once, then price every line from the snapshot.
        let menu_item_ids: Vec<Uuid> = request.items.iter().map(|i| i.menu_item_id).collect();
        let menu_items: HashMap<Uuid, menu_item::Model> = MenuItemEntity::find()
            .filter(menu_item::Column::Id.is_in(menu_item_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut subtotal = Decimal::ZERO;
        let mut item_models = Vec::with_capacity(request.items.len());

        for line in &request.items {
            if line.quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Line item quantity must be positive".to_string(),
                ));
            }
            let menu_item = menu_items.get(&line.menu_item_id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Menu item with ID {} not found",
                    line.menu_item_id
                ))
            })?;
            if !menu_item.is_available {
                return Err(ServiceError::InvalidOperation(format!(
                    "menu item '{}' is not available",
                    menu_item.name
                )));
            }

            subtotal += menu_item.price * Decimal::from(line.quantity);
            item_models.push(OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                menu_item_id: Set(menu_item.id),
                quantity: Set(line.quantity),
                price: Set(menu_item.price),
                notes: Set(line.notes.clone()),
                created_at: Set(now),
            });
        }

        let order = OrderActiveModel {
            id: Set(order_id),
            table_id: Set(table.id),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            subtotal: Set(subtotal),
            discount: Set(Decimal::ZERO),
            total: Set(subtotal),
            payment_method: Set(None),
            notes: Set(request.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(item_models.len());
        for item in item_models {
            items.push(item.insert(&txn).await?);
        }

        if table_status != TableStatus::Occupied {
            let mut active: TableActiveModel = table.into();
            active.status = Set(TableStatus::Occupied.as_str().to_string());
            active.update(&txn).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %subtotal, "order created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderCreated {
                    order_id,
                    table_id: order.table_id,
                    total: order.total,
                })
                .await
            {
                warn!(error = %e, "failed to publish order created event");
            }
        }

        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetailResponse, ServiceError> {
        let order = self.find_order(order_id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db_pool)
            .await?;

        Ok(OrderDetailResponse {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemResponse>, ServiceError> {
        self.find_order(order_id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db_pool)
            .await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.as_str()));
        }

        let paginator = query.paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let page_index = page.saturating_sub(1);
        let orders = paginator.fetch_page(page_index).await?;

        Ok(OrderListResponse {
            orders: orders.into_iter().map(Into::into).collect(),
            total,
            page: page.max(1),
            per_page: per_page.max(1),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_table_orders(
        &self,
        table_id: Uuid,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        TableEntity::find_by_id(table_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Table with ID {} not found", table_id))
            })?;

        let orders = OrderEntity::find()
            .filter(order::Column::TableId.eq(table_id))
            .order_by_asc(order::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    /// Kitchen/waiter pipeline progression. Only the next forward step is
    /// accepted; `paid` is owned by billing settlement.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_order(order_id).await?;
        let current = order.status().ok_or_else(|| {
            ServiceError::InternalError(format!("order {} has malformed status", order_id))
        })?;

        if !current.can_advance_to(request.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                current, request.status
            )));
        }

        let old_status = order.status.clone();
        let mut active: OrderActiveModel = order.into();
        active.status = Set(request.status.as_str().to_string());
        let updated = active.update(&*self.db_pool).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: updated.status.clone(),
                })
                .await
            {
                warn!(error = %e, "failed to publish order status event");
            }
        }

        Ok(updated.into())
    }

    /// Hands a table's served orders to billing: one pending payment per
    /// served order, table to bill-pending. Orders that already carry a
    /// pending payment are left untouched, so a retried request is safe.
    #[instrument(skip(self), fields(table_id = %table_id))]
    pub async fn send_to_billing(
        &self,
        table_id: Uuid,
    ) -> Result<SendToBillingResponse, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let table = TableEntity::find_by_id(table_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Table with ID {} not found", table_id))
            })?;

        let served_orders = OrderEntity::find()
            .filter(order::Column::TableId.eq(table_id))
            .filter(order::Column::Status.eq(OrderStatus::Served.as_str()))
            .all(&txn)
            .await?;
        if served_orders.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "table {} has no served orders to bill",
                table.number
            )));
        }

        let order_ids: Vec<Uuid> = served_orders.iter().map(|o| o.id).collect();
        let existing_pending: Vec<Uuid> = PaymentEntity::find()
            .filter(payment::Column::OrderId.is_in(order_ids.clone()))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.order_id)
            .collect();

        let mut total_amount = Decimal::ZERO;
        let mut newly_sent = Vec::new();
        for order in &served_orders {
            total_amount += order.total;
            if existing_pending.contains(&order.id) {
                continue;
            }
            PaymentActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                amount: Set(order.total),
                payment_method: Set(String::new()),
                status: Set(PaymentStatus::Pending.as_str().to_string()),
                transaction_id: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            newly_sent.push(order.id);
        }

        let old_table_status = table.status.clone();
        let table_was_bill_pending = table.status() == Some(TableStatus::BillPending);
        if !table_was_bill_pending {
            let mut active: TableActiveModel = table.into();
            active.status = Set(TableStatus::BillPending.as_str().to_string());
            active.update(&txn).await?;
        }

        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            for order in served_orders.iter().filter(|o| newly_sent.contains(&o.id)) {
                if let Err(e) = sender
                    .send(Event::OrderSentToBilling {
                        order_id: order.id,
                        table_id,
                        amount: order.total,
                    })
                    .await
                {
                    warn!(error = %e, "failed to publish send-to-billing event");
                }
            }
            if !table_was_bill_pending {
                if let Err(e) = sender
                    .send(Event::TableStatusChanged {
                        table_id,
                        old_status: old_table_status,
                        new_status: TableStatus::BillPending.as_str().to_string(),
                    })
                    .await
                {
                    warn!(error = %e, "failed to publish table status event");
                }
            }
        }

        Ok(SendToBillingResponse {
            table_id,
            order_ids,
            total_amount,
        })
    }

    async fn find_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order with ID {} not found", order_id)))
    }
}
