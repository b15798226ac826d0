use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::services::tables::{CreateTableRequest, TableResponse, UpdateTableStatusRequest};
use crate::{ApiResponse, ApiResult, AppState};

#[utoipa::path(
    post,
    path = "/api/v1/tables",
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Table number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "tables"
)]
pub async fn create_table(
    State(state): State<AppState>,
    Json(payload): Json<CreateTableRequest>,
) -> ApiResult<TableResponse> {
    let table = state.services.tables.create_table(payload).await?;
    Ok(Json(ApiResponse::success(table)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tables",
    responses(
        (status = 200, description = "Tables listed")
    ),
    tag = "tables"
)]
pub async fn list_tables(State(state): State<AppState>) -> ApiResult<Vec<TableResponse>> {
    let tables = state.services.tables.list_tables().await?;
    Ok(Json(ApiResponse::success(tables)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tables/{id}",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Table returned"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tables"
)]
pub async fn get_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TableResponse> {
    let table = state.services.tables.get_table(id).await?;
    Ok(Json(ApiResponse::success(table)))
}

#[utoipa::path(
    put,
    path = "/api/v1/tables/{id}/status",
    params(("id" = Uuid, Path, description = "Table ID")),
    request_body = UpdateTableStatusRequest,
    responses(
        (status = 200, description = "Table status updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tables"
)]
pub async fn update_table_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTableStatusRequest>,
) -> ApiResult<TableResponse> {
    let table = state.services.tables.update_table_status(id, payload).await?;
    Ok(Json(ApiResponse::success(table)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tables/{id}",
    params(("id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Table deleted"),
        (status = 400, description = "Table is not free", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tables"
)]
pub async fn delete_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.tables.delete_table(id).await?;
    Ok(Json(ApiResponse::success(())))
}
