use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{entities, errors, handlers, services, AppState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mesa-pos API",
        description = "Restaurant point-of-sale backend: order lifecycle, billing settlement and inventory ledger",
        version = env!("CARGO_PKG_VERSION")
    ),
    paths(
        handlers::tables::create_table,
        handlers::tables::list_tables,
        handlers::tables::get_table,
        handlers::tables::update_table_status,
        handlers::tables::delete_table,
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::get_order_items,
        handlers::orders::update_order_status,
        handlers::orders::list_table_orders,
        handlers::orders::send_to_billing,
        handlers::billing::pending_bills,
        handlers::billing::billing_history,
        handlers::billing::check_feasibility,
        handlers::billing::settle_bill,
        handlers::billing::billing_insights,
        handlers::inventory::create_item,
        handlers::inventory::list_items,
        handlers::inventory::low_stock,
        handlers::inventory::get_item,
        handlers::inventory::update_item,
        handlers::inventory::delete_item,
        handlers::inventory::restock,
        handlers::inventory::list_transactions,
        handlers::inventory::create_category,
        handlers::inventory::list_categories,
        handlers::inventory::delete_category,
        handlers::inventory::import_inventory,
        handlers::menu::create_category,
        handlers::menu::list_categories,
        handlers::menu::delete_category,
        handlers::menu::create_item,
        handlers::menu::list_items,
        handlers::menu::get_item,
        handlers::menu::update_item,
        handlers::menu::delete_item,
        handlers::menu::set_recipe_row,
        handlers::menu::get_recipe,
        handlers::menu::delete_recipe_row,
        handlers::menu::scan_menu,
        handlers::menu::apply_menu_scan,
    ),
    components(schemas(
        errors::ErrorResponse,
        entities::dining_table::TableStatus,
        entities::order::OrderStatus,
        entities::payment::PaymentStatus,
        entities::payment::PaymentMethod,
        services::tables::CreateTableRequest,
        services::tables::UpdateTableStatusRequest,
        services::tables::TableResponse,
        services::orders::CreateOrderRequest,
        services::orders::CreateOrderItemRequest,
        services::orders::UpdateOrderStatusRequest,
        services::orders::OrderResponse,
        services::orders::OrderItemResponse,
        services::orders::OrderDetailResponse,
        services::orders::OrderListResponse,
        services::orders::SendToBillingResponse,
        services::billing::PendingBillResponse,
        services::billing::PaymentResponse,
        services::billing::FeasibilityResponse,
        services::billing::FeasibilityWarning,
        services::billing::SettleBillRequest,
        services::billing::SettlementResponse,
        services::billing::DeductionSummary,
        services::inventory::CreateInventoryItemRequest,
        services::inventory::UpdateInventoryItemRequest,
        services::inventory::RestockRequest,
        services::inventory::InventoryItemResponse,
        services::inventory::CreateInventoryCategoryRequest,
        services::inventory::InventoryCategoryResponse,
        services::inventory::LedgerEntryResponse,
        services::import::ImportSummary,
        services::insights::BillingInsightsResponse,
        services::insights::BillingSummary,
        services::insights::PaymentMethodBreakdown,
        services::insights::TopSellingItem,
        services::menu::CreateMenuCategoryRequest,
        services::menu::CreateMenuItemRequest,
        services::menu::UpdateMenuItemRequest,
        services::menu::SetRecipeRowRequest,
        services::menu::MenuCategoryResponse,
        services::menu::MenuItemResponse,
        services::menu::RecipeRowResponse,
        services::menu_scan::MenuScanRequest,
        services::menu_scan::ExtractionConfidence,
        services::menu_scan::MenuScanDraft,
        services::menu_scan::ScannedCategory,
        services::menu_scan::ScannedMenuItem,
        services::menu_scan::ApplyMenuScanResponse,
    )),
    tags(
        (name = "tables", description = "Dining table lifecycle"),
        (name = "orders", description = "Order intake and kitchen progression"),
        (name = "billing", description = "Bill aggregation, feasibility and settlement"),
        (name = "inventory", description = "Stock, restocking, ledger and bulk import"),
        (name = "menu", description = "Menu catalog, recipes and menu scanning"),
        (name = "insights", description = "Aggregated billing insights")
    )
)]
pub struct ApiDoc;

/// Swagger UI router, mounted beside the API routes.
pub fn swagger_ui() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
