use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::services::orders::{
    CreateOrderRequest, OrderDetailResponse, OrderItemResponse, OrderListResponse, OrderResponse,
    SendToBillingResponse, UpdateOrderStatusRequest,
};
use crate::{ApiResponse, ApiResult, AppState, ListQuery};

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created with price snapshots"),
        (status = 400, description = "Empty order or unavailable item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Table or menu item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderDetailResponse> {
    let order = state.services.orders.create_order(payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListQuery, OrderFilters),
    responses(
        (status = 200, description = "Orders listed")
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filters): Query<OrderFilters>,
) -> ApiResult<OrderListResponse> {
    let orders = state
        .services
        .orders
        .list_orders(query.page, query.limit, filters.status)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order returned with items"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetailResponse> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order items returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderItemResponse>> {
    let items = state.services.orders.get_order_items(id).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order advanced one step"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update_order_status(id, payload).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tables/{id}/orders",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Table orders returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_table_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderResponse>> {
    let orders = state.services.orders.list_table_orders(id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    post,
    path = "/api/v1/tables/{id}/send-to-billing",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Pending payments created, table bill-pending"),
        (status = 400, description = "No served orders on the table", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn send_to_billing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SendToBillingResponse> {
    let summary = state.services.orders.send_to_billing(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
