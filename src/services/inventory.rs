use crate::{
    db::DbPool,
    entities::inventory_category::{
        self, ActiveModel as CategoryActiveModel, Entity as CategoryEntity,
        Model as CategoryModel,
    },
    entities::inventory_item::{
        self, ActiveModel as ItemActiveModel, Entity as ItemEntity, Model as ItemModel,
    },
    entities::inventory_transaction::{
        self, ActiveModel as LedgerActiveModel, Entity as LedgerEntity, Model as LedgerModel,
        LedgerEntryType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub quantity: Decimal,
    #[validate(length(min = 1, message = "Unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub restock_threshold: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: Option<String>,
    pub restock_threshold: Option<Decimal>,
    pub price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestockRequest {
    pub quantity: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryItemResponse {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub restock_threshold: Decimal,
    pub price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub last_restocked: Option<DateTime<Utc>>,
    pub low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ItemModel> for InventoryItemResponse {
    fn from(model: ItemModel) -> Self {
        let low_stock = model.is_low_stock();
        Self {
            id: model.id,
            name: model.name,
            category_id: model.category_id,
            quantity: model.quantity,
            unit: model.unit,
            restock_threshold: model.restock_threshold,
            price: model.price,
            expiry_date: model.expiry_date,
            last_restocked: model.last_restocked,
            low_stock,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryCategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryModel> for InventoryCategoryResponse {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryCategoryRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub transaction_type: String,
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerModel> for LedgerEntryResponse {
    fn from(model: LedgerModel) -> Self {
        Self {
            id: model.id,
            inventory_item_id: model.inventory_item_id,
            transaction_type: model.transaction_type,
            quantity: model.quantity,
            previous_quantity: model.previous_quantity,
            new_quantity: model.new_quantity,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}

/// Finds an inventory category by case-insensitive name, creating it on
/// first use. Repeated calls with any casing of the same name resolve to
/// the same row.
pub async fn resolve_category<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<CategoryModel, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError(
            "Category name is required".to_string(),
        ));
    }

    let categories = CategoryEntity::find().all(conn).await?;
    if let Some(existing) = categories
        .into_iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
    {
        return Ok(existing);
    }

    let created = CategoryActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

/// Service for stock on hand, restocking and the quantity-change ledger.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateInventoryItemRequest,
    ) -> Result<InventoryItemResponse, ServiceError> {
        request.validate()?;
        if request.quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        CategoryEntity::find_by_id(request.category_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory category with ID {} not found",
                    request.category_id
                ))
            })?;

        let model = ItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            category_id: Set(request.category_id),
            quantity: Set(request.quantity),
            unit: Set(request.unit),
            restock_threshold: Set(request.restock_threshold),
            price: Set(request.price),
            expiry_date: Set(request.expiry_date),
            last_restocked: Set(None),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(model.into())
    }

    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        request: UpdateInventoryItemRequest,
    ) -> Result<InventoryItemResponse, ServiceError> {
        let item = self.find_item(item_id).await?;
        let mut active: ItemActiveModel = item.into();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Name cannot be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(category_id) = request.category_id {
            CategoryEntity::find_by_id(category_id)
                .one(&*self.db_pool)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Inventory category with ID {} not found",
                        category_id
                    ))
                })?;
            active.category_id = Set(category_id);
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }
        if let Some(threshold) = request.restock_threshold {
            active.restock_threshold = Set(threshold);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(expiry_date) = request.expiry_date {
            active.expiry_date = Set(Some(expiry_date));
        }

        let updated = active.update(&*self.db_pool).await?;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        self.find_item(item_id).await?;
        ItemEntity::delete_by_id(item_id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<InventoryItemResponse, ServiceError> {
        Ok(self.find_item(item_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<InventoryItemResponse>, ServiceError> {
        let mut query = ItemEntity::find().order_by_asc(inventory_item::Column::Name);
        if let Some(category_id) = category_id {
            query = query.filter(inventory_item::Column::CategoryId.eq(category_id));
        }
        let items = query.all(&*self.db_pool).await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Items at or below their restock threshold.
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<InventoryItemResponse>, ServiceError> {
        let items = ItemEntity::find()
            .order_by_asc(inventory_item::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(items
            .into_iter()
            .filter(ItemModel::is_low_stock)
            .map(Into::into)
            .collect())
    }

    /// Adds stock, stamps `last_restocked` and appends a restock ledger
    /// row, all in one transaction.
    #[instrument(skip(self, request), fields(item_id = %item_id))]
    pub async fn restock(
        &self,
        item_id: Uuid,
        request: RestockRequest,
    ) -> Result<InventoryItemResponse, ServiceError> {
        if request.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Restock quantity must be positive".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        let item = ItemEntity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item with ID {} not found", item_id))
            })?;

        let previous = item.quantity;
        let new_quantity = previous + request.quantity;
        let mut active: ItemActiveModel = item.into();
        active.quantity = Set(new_quantity);
        active.last_restocked = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        LedgerActiveModel {
            id: Set(Uuid::new_v4()),
            inventory_item_id: Set(item_id),
            transaction_type: Set(LedgerEntryType::Restock.as_str().to_string()),
            quantity: Set(request.quantity),
            previous_quantity: Set(previous),
            new_quantity: Set(new_quantity),
            notes: Set(request.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::InventoryRestocked {
                    inventory_item_id: item_id,
                    quantity: request.quantity,
                    new_quantity,
                })
                .await
            {
                warn!(error = %e, "failed to publish restock event");
            }
        }

        Ok(updated.into())
    }

    /// The quantity-change ledger for one item, most recent first.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        item_id: Uuid,
        limit: u64,
    ) -> Result<Vec<LedgerEntryResponse>, ServiceError> {
        self.find_item(item_id).await?;
        let entries = LedgerEntity::find()
            .filter(inventory_transaction::Column::InventoryItemId.eq(item_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .paginate(&*self.db_pool, limit.clamp(1, 500))
            .fetch_page(0)
            .await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        request: CreateInventoryCategoryRequest,
    ) -> Result<InventoryCategoryResponse, ServiceError> {
        request.validate()?;
        let category = resolve_category(&*self.db_pool, &request.name).await?;
        Ok(category.into())
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<InventoryCategoryResponse>, ServiceError> {
        let categories = CategoryEntity::find()
            .order_by_asc(inventory_category::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        CategoryEntity::find_by_id(category_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory category with ID {} not found",
                    category_id
                ))
            })?;

        let in_use = ItemEntity::find()
            .filter(inventory_item::Column::CategoryId.eq(category_id))
            .count(&*self.db_pool)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "category still has {} items",
                in_use
            )));
        }

        CategoryEntity::delete_by_id(category_id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    async fn find_item(&self, item_id: Uuid) -> Result<ItemModel, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory item with ID {} not found", item_id))
            })
    }
}
