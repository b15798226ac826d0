use crate::{
    db::DbPool,
    entities::inventory_item::Entity as InventoryItemEntity,
    entities::menu_category::{
        self, ActiveModel as CategoryActiveModel, Entity as CategoryEntity,
        Model as CategoryModel,
    },
    entities::menu_item::{
        self, ActiveModel as MenuItemActiveModel, Entity as MenuItemEntity, Model as MenuItemModel,
    },
    entities::menu_item_ingredient::{
        self, ActiveModel as RecipeActiveModel, Entity as RecipeEntity, Model as RecipeModel,
    },
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMenuCategoryRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub price: Decimal,
    pub category_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetRecipeRowRequest {
    pub inventory_item_id: Uuid,
    /// Amount of the ingredient consumed per serving.
    pub quantity_required: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuCategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryModel> for MenuCategoryResponse {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            display_order: model.display_order,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category_id: Uuid,
    pub description: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<MenuItemModel> for MenuItemResponse {
    fn from(model: MenuItemModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            category_id: model.category_id,
            description: model.description,
            is_available: model.is_available,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeRowResponse {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub inventory_item_id: Uuid,
    pub quantity_required: Decimal,
}

impl From<RecipeModel> for RecipeRowResponse {
    fn from(model: RecipeModel) -> Self {
        Self {
            id: model.id,
            menu_item_id: model.menu_item_id,
            inventory_item_id: model.inventory_item_id,
            quantity_required: model.quantity_required,
        }
    }
}

/// Finds a menu category by case-insensitive name, creating it on first
/// use.
pub async fn resolve_menu_category<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    display_order: i32,
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
        display_order: Set(display_order),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(created)
}

/// Service for the menu catalog and per-dish recipes.
#[derive(Clone)]
pub struct MenuService {
    db_pool: Arc<DbPool>,
}

impl MenuService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        request: CreateMenuCategoryRequest,
    ) -> Result<MenuCategoryResponse, ServiceError> {
        request.validate()?;
        let category =
            resolve_menu_category(&*self.db_pool, &request.name, request.display_order).await?;
        Ok(category.into())
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<MenuCategoryResponse>, ServiceError> {
        let categories = CategoryEntity::find()
            .order_by_asc(menu_category::Column::DisplayOrder)
            .order_by_asc(menu_category::Column::Name)
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
                    "Menu category with ID {} not found",
                    category_id
                ))
            })?;

        let in_use = MenuItemEntity::find()
            .filter(menu_item::Column::CategoryId.eq(category_id))
            .count(&*self.db_pool)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "category still has {} menu items",
                in_use
            )));
        }

        CategoryEntity::delete_by_id(category_id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateMenuItemRequest,
    ) -> Result<MenuItemResponse, ServiceError> {
        request.validate()?;
        if request.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }

        CategoryEntity::find_by_id(request.category_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Menu category with ID {} not found",
                    request.category_id
                ))
            })?;

        let model = MenuItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            price: Set(request.price),
            category_id: Set(request.category_id),
            description: Set(request.description),
            is_available: Set(request.is_available),
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
        request: UpdateMenuItemRequest,
    ) -> Result<MenuItemResponse, ServiceError> {
        let item = self.find_item(item_id).await?;
        let mut active: MenuItemActiveModel = item.into();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Name cannot be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Price cannot be negative".to_string(),
                ));
            }
            active.price = Set(price);
        }
        if let Some(category_id) = request.category_id {
            CategoryEntity::find_by_id(category_id)
                .one(&*self.db_pool)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Menu category with ID {} not found",
                        category_id
                    ))
                })?;
            active.category_id = Set(category_id);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(is_available) = request.is_available {
            active.is_available = Set(is_available);
        }

        let updated = active.update(&*self.db_pool).await?;
        Ok(updated.into())
    }

    /// Removing a dish is blocked while order lines reference it; order
    /// history keeps its price snapshots meaningful.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        self.find_item(item_id).await?;

        let referenced = OrderItemEntity::find()
            .filter(order_item::Column::MenuItemId.eq(item_id))
            .count(&*self.db_pool)
            .await?;
        if referenced > 0 {
            return Err(ServiceError::InvalidOperation(
                "menu item appears on existing orders, mark it unavailable instead".to_string(),
            ));
        }

        RecipeEntity::delete_many()
            .filter(menu_item_ingredient::Column::MenuItemId.eq(item_id))
            .exec(&*self.db_pool)
            .await?;
        MenuItemEntity::delete_by_id(item_id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<MenuItemResponse, ServiceError> {
        Ok(self.find_item(item_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<MenuItemResponse>, ServiceError> {
        let mut query = MenuItemEntity::find().order_by_asc(menu_item::Column::Name);
        if let Some(category_id) = category_id {
            query = query.filter(menu_item::Column::CategoryId.eq(category_id));
        }
        let items = query.all(&*self.db_pool).await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Replaces one ingredient row of a dish's recipe (upsert by
    /// menu item + ingredient pair).
    #[instrument(skip(self, request), fields(menu_item_id = %menu_item_id))]
    pub async fn set_recipe_row(
        &self,
        menu_item_id: Uuid,
        request: SetRecipeRowRequest,
    ) -> Result<RecipeRowResponse, ServiceError> {
        if request.quantity_required <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity required must be positive".to_string(),
            ));
        }

        self.find_item(menu_item_id).await?;
        InventoryItemEntity::find_by_id(request.inventory_item_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory item with ID {} not found",
                    request.inventory_item_id
                ))
            })?;

        let existing = RecipeEntity::find()
            .filter(menu_item_ingredient::Column::MenuItemId.eq(menu_item_id))
            .filter(
                menu_item_ingredient::Column::InventoryItemId.eq(request.inventory_item_id),
            )
            .one(&*self.db_pool)
            .await?;

        let row = match existing {
            Some(model) => {
                let mut active: RecipeActiveModel = model.into();
                active.quantity_required = Set(request.quantity_required);
                active.update(&*self.db_pool).await?
            }
            None => {
                RecipeActiveModel {
                    id: Set(Uuid::new_v4()),
                    menu_item_id: Set(menu_item_id),
                    inventory_item_id: Set(request.inventory_item_id),
                    quantity_required: Set(request.quantity_required),
                    ..Default::default()
                }
                .insert(&*self.db_pool)
                .await?
            }
        };
        Ok(row.into())
    }

    #[instrument(skip(self))]
    pub async fn get_recipe(
        &self,
        menu_item_id: Uuid,
    ) -> Result<Vec<RecipeRowResponse>, ServiceError> {
        self.find_item(menu_item_id).await?;
        let rows = RecipeEntity::find()
            .filter(menu_item_ingredient::Column::MenuItemId.eq(menu_item_id))
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn delete_recipe_row(
        &self,
        menu_item_id: Uuid,
        inventory_item_id: Uuid,
    ) -> Result<(), ServiceError> {
        let deleted = RecipeEntity::delete_many()
            .filter(menu_item_ingredient::Column::MenuItemId.eq(menu_item_id))
            .filter(menu_item_ingredient::Column::InventoryItemId.eq(inventory_item_id))
            .exec(&*self.db_pool)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Recipe row not found".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_item(&self, item_id: Uuid) -> Result<MenuItemModel, ServiceError> {
        MenuItemEntity::find_by_id(item_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Menu item with ID {} not found", item_id))
            })
    }
}
