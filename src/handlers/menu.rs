use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::services::menu::{
    CreateMenuCategoryRequest, CreateMenuItemRequest, MenuCategoryResponse, MenuItemResponse,
    RecipeRowResponse, SetRecipeRowRequest, UpdateMenuItemRequest,
};
use crate::services::menu_scan::{ApplyMenuScanResponse, MenuScanDraft, MenuScanRequest};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MenuFilters {
    pub category_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/menu/categories",
    request_body = CreateMenuCategoryRequest,
    responses(
        (status = 200, description = "Category created or resolved by name")
    ),
    tag = "menu"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuCategoryRequest>,
) -> ApiResult<MenuCategoryResponse> {
    let category = state.services.menu.create_category(payload).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/categories",
    responses(
        (status = 200, description = "Categories in display order")
    ),
    tag = "menu"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Vec<MenuCategoryResponse>> {
    let categories = state.services.menu.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/menu/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category still in use", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.menu.delete_category(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/menu/items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuItemRequest>,
) -> ApiResult<MenuItemResponse> {
    let item = state.services.menu.create_item(payload).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/items",
    params(MenuFilters),
    responses(
        (status = 200, description = "Menu items listed")
    ),
    tag = "menu"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<MenuFilters>,
) -> ApiResult<Vec<MenuItemResponse>> {
    let items = state.services.menu.list_items(filters.category_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MenuItemResponse> {
    let item = state.services.menu.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/menu/items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> ApiResult<MenuItemResponse> {
    let item = state.services.menu.update_item(id, payload).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/menu/items/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item deleted"),
        (status = 400, description = "Item appears on existing orders", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    state.services.menu.delete_item(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    put,
    path = "/api/v1/menu/items/{id}/recipe",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = SetRecipeRowRequest,
    responses(
        (status = 200, description = "Recipe row upserted"),
        (status = 400, description = "Non-positive quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu or inventory item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn set_recipe_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRecipeRowRequest>,
) -> ApiResult<RecipeRowResponse> {
    let row = state.services.menu.set_recipe_row(id, payload).await?;
    Ok(Json(ApiResponse::success(row)))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/items/{id}/recipe",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Recipe rows returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<RecipeRowResponse>> {
    let rows = state.services.menu.get_recipe(id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/menu/items/{id}/recipe/{inventory_item_id}",
    params(
        ("id" = Uuid, Path, description = "Menu item ID"),
        ("inventory_item_id" = Uuid, Path, description = "Inventory item ID")
    ),
    responses(
        (status = 200, description = "Recipe row deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn delete_recipe_row(
    State(state): State<AppState>,
    Path((id, inventory_item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state
        .services
        .menu
        .delete_recipe_row(id, inventory_item_id)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/menu/scan",
    request_body = MenuScanRequest,
    responses(
        (status = 200, description = "Draft extracted for human review; nothing persisted"),
        (status = 400, description = "Invalid base64 image", body = crate::errors::ErrorResponse),
        (status = 502, description = "OCR or extraction endpoint failed", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn scan_menu(
    State(state): State<AppState>,
    Json(payload): Json<MenuScanRequest>,
) -> ApiResult<MenuScanDraft> {
    let draft = state.services.menu_scan.scan(payload).await?;
    Ok(Json(ApiResponse::success(draft)))
}

#[utoipa::path(
    post,
    path = "/api/v1/menu/scan/apply",
    request_body = MenuScanDraft,
    responses(
        (status = 200, description = "Reviewed draft inserted via ordinary menu writes"),
        (status = 400, description = "Empty or invalid draft", body = crate::errors::ErrorResponse)
    ),
    tag = "menu"
)]
pub async fn apply_menu_scan(
    State(state): State<AppState>,
    Json(payload): Json<MenuScanDraft>,
) -> ApiResult<ApplyMenuScanResponse> {
    let result = state.services.menu_scan.apply(payload).await?;
    Ok(Json(ApiResponse::success(result)))
}
