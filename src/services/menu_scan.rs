use crate::{
    clients::{LlmClient, OcrClient},
    db::DbPool,
    entities::menu_category::Entity as MenuCategoryEntity,
    entities::menu_item::ActiveModel as MenuItemActiveModel,
    errors::ServiceError,
    services::menu::resolve_menu_category,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MenuScanRequest {
    /// Base64-encoded menu photo or scan.
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScannedCategory {
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScannedMenuItem {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Extractor's self-reported confidence in the draft.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtractionConfidence {
    High,
    Medium,
    Low,
}

/// Structured extraction result, returned for human review before any
/// database write happens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuScanDraft {
    pub categories: Vec<ScannedCategory>,
    pub menu_items: Vec<ScannedMenuItem>,
    pub extraction_confidence: ExtractionConfidence,
    /// Free-form remarks from the extraction, e.g. assumptions about
    /// currency or unreadable sections.
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplyMenuScanResponse {
    pub categories_created: usize,
    pub menu_items_created: usize,
}

fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["categories", "menu_items", "extraction_confidence", "notes"],
        "properties": {
            "categories": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "display_order"],
                    "properties": {
                        "name": { "type": "string" },
                        "display_order": { "type": "integer" }
                    }
                }
            },
            "menu_items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "price", "category"],
                    "properties": {
                        "name": { "type": "string" },
                        "price": { "type": "number" },
                        "category": { "type": "string" },
                        "description": { "type": "string" },
                        "is_available": { "type": "boolean" }
                    }
                }
            },
            "extraction_confidence": {
                "type": "string",
                "enum": ["high", "medium", "low"]
            },
            "notes": {
                "type": "array",
                "items": { "type": "string" }
            }
        }
    })
}

/// Service turning a menu image into a reviewed-then-applied menu draft:
/// OCR, a cleanup pass, schema-constrained extraction, and ordinary menu
/// inserts on apply.
#[derive(Clone)]
pub struct MenuScanService {
    db_pool: Arc<DbPool>,
    ocr: Arc<OcrClient>,
    llm: Arc<LlmClient>,
}

impl MenuScanService {
    pub fn new(db_pool: Arc<DbPool>, ocr: Arc<OcrClient>, llm: Arc<LlmClient>) -> Self {
        Self { db_pool, ocr, llm }
    }

    /// Produces a draft for human review. Nothing is persisted here.
    #[instrument(skip(self, request))]
    pub async fn scan(&self, request: MenuScanRequest) -> Result<MenuScanDraft, ServiceError> {
        if BASE64.decode(request.image.as_bytes()).is_err() {
            return Err(ServiceError::ValidationError(
                "image is not valid base64".to_string(),
            ));
        }

        let raw_text = self.ocr.extract_text(&request.image).await?;

        let cleaned = self
            .llm
            .complete(
                "You clean up OCR output from restaurant menus. Fix obvious recognition \
                 mistakes, keep every dish name and price, drop page noise. Reply with the \
                 cleaned text only.",
                &raw_text,
            )
            .await?;

        let extracted = self
            .llm
            .complete_json(
                "Extract the menu structure from the following cleaned menu text.",
                &cleaned,
                "menu_extraction",
                extraction_schema(),
            )
            .await?;

        let draft: MenuScanDraft = serde_json::from_str(&extracted).map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "extraction did not match the expected schema: {}",
                e
            ))
        })?;

        info!(
            categories = draft.categories.len(),
            menu_items = draft.menu_items.len(),
            confidence = %draft.extraction_confidence,
            notes = draft.notes.len(),
            "menu scan produced a draft"
        );
        Ok(draft)
    }

    /// Inserts a reviewed draft. Categories resolve case-insensitively by
    /// name, so re-applying against an existing menu never duplicates
    /// them.
    #[instrument(skip(self, draft), fields(menu_items = draft.menu_items.len()))]
    pub async fn apply(&self, draft: MenuScanDraft) -> Result<ApplyMenuScanResponse, ServiceError> {
        if draft.menu_items.is_empty() {
            return Err(ServiceError::ValidationError(
                "draft contains no menu items".to_string(),
            ));
        }
        for item in &draft.menu_items {
            if item.name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "menu item name cannot be empty".to_string(),
                ));
            }
            if item.price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "menu item '{}' has a negative price",
                    item.name
                )));
            }
        }

        let txn = self.db_pool.begin().await?;

        // Case-insensitive names already present; grows as the draft
        // creates new ones, so a name repeated in the draft (or reachable
        // only through an item's category) is counted once.
        let mut known_names: HashSet<String> = MenuCategoryEntity::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| c.name.to_ascii_lowercase())
            .collect();

        let mut categories_created = 0;
        for category in &draft.categories {
            if known_names.insert(category.name.trim().to_ascii_lowercase()) {
                categories_created += 1;
            }
            resolve_menu_category(&txn, &category.name, category.display_order).await?;
        }

        let mut menu_items_created = 0;
        for item in &draft.menu_items {
            let display_order = draft
                .categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&item.category))
                .map(|c| c.display_order)
                .unwrap_or(0);
            if known_names.insert(item.category.trim().to_ascii_lowercase()) {
                categories_created += 1;
            }
            let category = resolve_menu_category(&txn, &item.category, display_order).await?;

            MenuItemActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(item.name.trim().to_string()),
                price: Set(item.price),
                category_id: Set(category.id),
                description: Set(item.description.clone()),
                is_available: Set(item.is_available),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            menu_items_created += 1;
        }

        txn.commit().await?;

        Ok(ApplyMenuScanResponse {
            categories_created,
            menu_items_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn draft_deserializes_from_extraction_json() {
        let raw = r#"{
            "categories": [{"name": "Starters", "display_order": 1}],
            "menu_items": [
                {"name": "Paneer Tikka", "price": 240, "category": "Starters"},
                {"name": "Veg Soup", "price": 120.50, "category": "Starters",
                 "description": "of the day", "is_available": false}
            ],
            "extraction_confidence": "high",
            "notes": ["prices assumed INR"]
        }"#;

        let draft: MenuScanDraft = serde_json::from_str(raw).unwrap();
        assert_eq!(draft.categories.len(), 1);
        assert_eq!(draft.extraction_confidence, ExtractionConfidence::High);
        assert_eq!(draft.notes, vec!["prices assumed INR"]);
        assert_eq!(draft.menu_items[0].price, dec!(240));
        assert!(draft.menu_items[0].is_available);
        assert_eq!(draft.menu_items[1].price, dec!(120.50));
        assert!(!draft.menu_items[1].is_available);
    }

    #[test]
    fn draft_rejects_missing_required_fields() {
        let raw = r#"{"categories": [], "menu_items": [{"name": "Soup"}]}"#;
        assert!(serde_json::from_str::<MenuScanDraft>(raw).is_err());
    }

    #[test]
    fn confidence_is_an_enum_not_a_score() {
        let raw = r#"{
            "categories": [],
            "menu_items": [],
            "extraction_confidence": 0.92,
            "notes": []
        }"#;
        assert!(serde_json::from_str::<MenuScanDraft>(raw).is_err());

        let raw = r#"{
            "categories": [],
            "menu_items": [],
            "extraction_confidence": "medium",
            "notes": []
        }"#;
        let draft: MenuScanDraft = serde_json::from_str(raw).unwrap();
        assert_eq!(draft.extraction_confidence, ExtractionConfidence::Medium);
    }
}
