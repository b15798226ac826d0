pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common query parameters for list endpoints.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let tables = Router::new()
        .route(
            "/tables",
            post(handlers::tables::create_table).get(handlers::tables::list_tables),
        )
        .route(
            "/tables/:id",
            get(handlers::tables::get_table).delete(handlers::tables::delete_table),
        )
        .route("/tables/:id/status", put(handlers::tables::update_table_status))
        .route("/tables/:id/orders", get(handlers::orders::list_table_orders))
        .route(
            "/tables/:id/send-to-billing",
            post(handlers::orders::send_to_billing),
        );

    let orders = Router::new()
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", get(handlers::orders::get_order_items))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        );

    let billing = Router::new()
        .route("/billing/pending", get(handlers::billing::pending_bills))
        .route("/billing/history", get(handlers::billing::billing_history))
        .route(
            "/billing/:table_id/feasibility",
            get(handlers::billing::check_feasibility),
        )
        .route(
            "/billing/:table_id/settle",
            post(handlers::billing::settle_bill),
        )
        .route("/insights/billing", get(handlers::billing::billing_insights));

    let inventory = Router::new()
        .route(
            "/inventory",
            post(handlers::inventory::create_item).get(handlers::inventory::list_items),
        )
        .route("/inventory/low-stock", get(handlers::inventory::low_stock))
        .route("/inventory/import", post(handlers::inventory::import_inventory))
        .route(
            "/inventory/categories",
            post(handlers::inventory::create_category).get(handlers::inventory::list_categories),
        )
        .route(
            "/inventory/categories/:id",
            delete(handlers::inventory::delete_category),
        )
        .route(
            "/inventory/:id",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        .route("/inventory/:id/restock", post(handlers::inventory::restock))
        .route(
            "/inventory/:id/transactions",
            get(handlers::inventory::list_transactions),
        );

    let menu = Router::new()
        .route(
            "/menu/categories",
            post(handlers::menu::create_category).get(handlers::menu::list_categories),
        )
        .route("/menu/categories/:id", delete(handlers::menu::delete_category))
        .route(
            "/menu/items",
            post(handlers::menu::create_item).get(handlers::menu::list_items),
        )
        .route(
            "/menu/items/:id",
            get(handlers::menu::get_item)
                .put(handlers::menu::update_item)
                .delete(handlers::menu::delete_item),
        )
        .route(
            "/menu/items/:id/recipe",
            put(handlers::menu::set_recipe_row).get(handlers::menu::get_recipe),
        )
        .route(
            "/menu/items/:id/recipe/:inventory_item_id",
            delete(handlers::menu::delete_recipe_row),
        )
        .route("/menu/scan", post(handlers::menu::scan_menu))
        .route("/menu/scan/apply", post(handlers::menu::apply_menu_scan));

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(tables)
        .merge(orders)
        .merge(billing)
        .merge(inventory)
        .merge(menu)
}

/// Builds the full application router: liveness root, versioned API and
/// Swagger UI.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    state.db.ping().await?;
    let health_data = json!({
        "status": "healthy",
        "database": "reachable",
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_response_carries_data_and_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        let meta = response.meta.expect("metadata expected");
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn error_response_has_no_data() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }

    #[test]
    fn validation_errors_are_listed() {
        let response = ApiResponse::<()>::validation_errors(vec!["missing".into()]);
        assert_eq!(response.errors.as_ref().map(Vec::len), Some(1));
    }
}
