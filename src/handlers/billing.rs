use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::services::billing::{
    FeasibilityResponse, PaymentResponse, PendingBillResponse, SettleBillRequest,
    SettlementResponse,
};
use crate::services::insights::BillingInsightsResponse;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/pending",
    responses(
        (status = 200, description = "Pending bills for every bill-pending table")
    ),
    tag = "billing"
)]
pub async fn pending_bills(State(state): State<AppState>) -> ApiResult<Vec<PendingBillResponse>> {
    let bills = state.services.billing.pending_bills().await?;
    Ok(Json(ApiResponse::success(bills)))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Completed payments, most recent first")
    ),
    tag = "billing"
)]
pub async fn billing_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<PaymentResponse>> {
    let limit = query
        .limit
        .unwrap_or(state.config.billing_history_limit);
    let history = state.services.billing.billing_history(limit).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/{table_id}/feasibility",
    params(("table_id" = Uuid, Path, description = "Table ID")),
    responses(
        (status = 200, description = "Stock warnings for the table's bill; empty means feasible"),
        (status = 400, description = "No bill pending for the table", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "billing"
)]
pub async fn check_feasibility(
    State(state): State<AppState>,
    Path(table_id): Path<Uuid>,
) -> ApiResult<FeasibilityResponse> {
    let result = state.services.billing.check_feasibility(table_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/billing/{table_id}/settle",
    params(("table_id" = Uuid, Path, description = "Table ID")),
    request_body = SettleBillRequest,
    responses(
        (status = 200, description = "Bill settled: payments completed, stock deducted, table freed"),
        (status = 400, description = "Invalid discount or no bill pending", body = crate::errors::ErrorResponse),
        (status = 409, description = "Settlement already in progress", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock without override", body = crate::errors::ErrorResponse)
    ),
    tag = "billing"
)]
pub async fn settle_bill(
    State(state): State<AppState>,
    Path(table_id): Path<Uuid>,
    Json(payload): Json<SettleBillRequest>,
) -> ApiResult<SettlementResponse> {
    let result = state.services.billing.settle(table_id, payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    get,
    path = "/api/v1/insights/billing",
    responses(
        (status = 200, description = "Aggregated billing summary with generated commentary"),
        (status = 502, description = "Text-generation endpoint unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn billing_insights(
    State(state): State<AppState>,
) -> ApiResult<BillingInsightsResponse> {
    let insights = state.services.insights.billing_insights().await?;
    Ok(Json(ApiResponse::success(insights)))
}
