pub mod billing;
pub mod inventory;
pub mod menu;
pub mod orders;
pub mod tables;

use crate::{
    clients::{LlmClient, OcrClient},
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
};
use std::sync::Arc;

pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub tables: Arc<crate::services::tables::TableService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub billing: Arc<crate::services::billing::BillingService>,
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub menu: Arc<crate::services::menu::MenuService>,
    pub import: Arc<crate::services::import::ImportService>,
    pub insights: Arc<crate::services::insights::InsightsService>,
    pub menu_scan: Arc<crate::services::menu_scan::MenuScanService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let ocr_endpoint = config
            .ocr_endpoint
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
        let llm_endpoint = config
            .llm_endpoint
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
        let ocr = Arc::new(OcrClient::new(ocr_endpoint)?);
        let llm = Arc::new(LlmClient::new(
            llm_endpoint,
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        )?);

        Ok(Self {
            tables: Arc::new(crate::services::tables::TableService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            orders: Arc::new(crate::services::orders::OrderService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            billing: Arc::new(crate::services::billing::BillingService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            inventory: Arc::new(crate::services::inventory::InventoryService::new(
                db_pool.clone(),
                Some(event_sender),
            )),
            menu: Arc::new(crate::services::menu::MenuService::new(db_pool.clone())),
            import: Arc::new(crate::services::import::ImportService::new(db_pool.clone())),
            insights: Arc::new(crate::services::insights::InsightsService::new(
                db_pool.clone(),
                llm.clone(),
                config.billing_history_limit,
            )),
            menu_scan: Arc::new(crate::services::menu_scan::MenuScanService::new(
                db_pool, ocr, llm,
            )),
        })
    }
}
