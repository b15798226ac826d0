use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::services::import::ImportSummary;
use crate::services::inventory::{
    CreateInventoryCategoryRequest, CreateInventoryItemRequest, InventoryCategoryResponse,
    InventoryItemResponse, LedgerEntryResponse, RestockRequest, UpdateInventoryItemRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct InventoryFilters {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LedgerQuery {
    pub limit: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 200, description = "Inventory item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryItemRequest>,
) -> ApiResult<InventoryItemResponse> {
    let item = state.services.inventory.create_item(payload).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryFilters),
    responses(
        (status = 200, description = "Inventory items listed")
    ),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<InventoryFilters>,
) -> ApiResult<Vec<InventoryItemResponse>> {
    let items = state
        .services
        .inventory
        .list_items(filters.category_id)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Items at or below their restock threshold")
    ),
    tag = "inventory"
)]
pub async fn low_stock(State(state): State<AppState>) -> ApiResult<Vec<InventoryItemResponse>> {
    let items = state.services.inventory.low_stock().await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InventoryItemResponse> {
    let item = state.services.inventory.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Inventory item updated"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryItemRequest>,
) -> ApiResult<InventoryItemResponse> {
    let item = state.services.inventory.update_item(id, payload).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    state.services.inventory.delete_item(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/restock",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "Stock added and ledger row appended"),
        (status = 400, description = "Non-positive quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn restock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestockRequest>,
) -> ApiResult<InventoryItemResponse> {
    let item = state.services.inventory.restock(id, payload).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}/transactions",
    params(("id" = Uuid, Path, description = "Inventory item ID"), LedgerQuery),
    responses(
        (status = 200, description = "Quantity-change ledger, most recent first"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Vec<LedgerEntryResponse>> {
    let entries = state
        .services
        .inventory
        .list_transactions(id, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/categories",
    request_body = CreateInventoryCategoryRequest,
    responses(
        (status = 200, description = "Category created or resolved by name")
    ),
    tag = "inventory"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryCategoryRequest>,
) -> ApiResult<InventoryCategoryResponse> {
    let category = state.services.inventory.create_category(payload).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/categories",
    responses(
        (status = 200, description = "Categories listed")
    ),
    tag = "inventory"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Vec<InventoryCategoryResponse>> {
    let categories = state.services.inventory.list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category still in use", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.inventory.delete_category(id).await?;
    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/import",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import summary with per-row error reporting"),
        (status = 400, description = "Missing header columns", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn import_inventory(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<ImportSummary> {
    let summary = state.services.import.import_inventory(&body).await?;
    Ok(Json(ApiResponse::success(summary)))
}
