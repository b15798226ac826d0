use crate::{
    db::DbPool,
    entities::inventory_item::ActiveModel as ItemActiveModel,
    errors::ServiceError,
    services::inventory::resolve_category,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "category",
    "quantity",
    "unit",
    "restock_threshold",
    "price",
];
const MAX_REPORTED_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub name: String,
    pub category: String,
    pub quantity: Decimal,
    pub unit: String,
    pub restock_threshold: Decimal,
    pub price: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    /// The first few row errors, each prefixed with its line number.
    pub errors: Vec<String>,
}

/// Splits one delimited line into trimmed fields. Quoting mechanics are
/// out of scope; values may not contain commas.
fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

/// Validates the header row, case-insensitively, against the required
/// column set. Returns the column order for positional parsing.
pub fn parse_header(line: &str) -> Result<Vec<String>, ServiceError> {
    let columns: Vec<String> = split_line(line)
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();
    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(ServiceError::ValidationError(format!(
                "missing required column '{}'",
                required
            )));
        }
    }
    Ok(columns)
}

/// Parses one data row against the header's column order.
pub fn parse_row(columns: &[String], line: &str) -> Result<ImportRow, String> {
    let fields = split_line(line);
    if fields.len() < columns.len() {
        return Err(format!(
            "expected {} fields, found {}",
            columns.len(),
            fields.len()
        ));
    }

    let field = |name: &str| -> Option<&str> {
        columns
            .iter()
            .position(|c| c == name)
            .map(|i| fields[i].as_str())
    };

    let name = field("name").unwrap_or_default().to_string();
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    let category = field("category").unwrap_or_default().to_string();
    if category.is_empty() {
        return Err("category is empty".to_string());
    }
    let unit = field("unit").unwrap_or_default().to_string();
    if unit.is_empty() {
        return Err("unit is empty".to_string());
    }

    let decimal = |column: &str| -> Result<Decimal, String> {
        let raw = field(column).unwrap_or_default();
        Decimal::from_str(raw).map_err(|_| format!("invalid {} '{}'", column, raw))
    };
    let quantity = decimal("quantity")?;
    if quantity < Decimal::ZERO {
        return Err("quantity cannot be negative".to_string());
    }
    let restock_threshold = decimal("restock_threshold")?;
    let price = decimal("price")?;

    let expiry_date = match field("expiry_date") {
        Some("") | None => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("invalid expiry_date '{}'", raw))?,
        ),
    };

    Ok(ImportRow {
        name,
        category,
        quantity,
        unit,
        restock_threshold,
        price,
        expiry_date,
    })
}

/// Service for bulk inventory import from delimited text.
#[derive(Clone)]
pub struct ImportService {
    db_pool: Arc<DbPool>,
}

impl ImportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Imports inventory rows with per-row error isolation: a failing row
    /// is counted and reported, and the batch continues. Categories are
    /// resolved case-insensitively and created on first use, so repeated
    /// imports never duplicate them.
    #[instrument(skip(self, body))]
    pub async fn import_inventory(&self, body: &str) -> Result<ImportSummary, ServiceError> {
        let mut lines = body.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| ServiceError::ValidationError("import body is empty".to_string()))?;
        let columns = parse_header(header)?;

        let mut imported = 0;
        let mut failed = 0;
        let mut errors = Vec::new();

        for (index, line) in lines.enumerate() {
            let line_number = index + 2;
            match self.import_row(&columns, line).await {
                Ok(()) => imported += 1,
                Err(message) => {
                    failed += 1;
                    if errors.len() < MAX_REPORTED_ERRORS {
                        errors.push(format!("line {}: {}", line_number, message));
                    }
                }
            }
        }

        info!(imported, failed, "inventory import finished");
        Ok(ImportSummary {
            imported,
            failed,
            errors,
        })
    }

    async fn import_row(&self, columns: &[String], line: &str) -> Result<(), String> {
        let row = parse_row(columns, line)?;

        let category = resolve_category(&*self.db_pool, &row.category)
            .await
            .map_err(|e| e.to_string())?;

        ItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(row.name),
            category_id: Set(category.id),
            quantity: Set(row.quantity),
            unit: Set(row.unit),
            restock_threshold: Set(row.restock_threshold),
            price: Set(row.price),
            expiry_date: Set(row.expiry_date),
            last_restocked: Set(None),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| e.to_string())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn header_requires_all_columns() {
        assert!(parse_header("name,category,quantity,unit,restock_threshold,price").is_ok());
        assert!(
            parse_header("Name,Category,Quantity,Unit,Restock_Threshold,Price,Expiry_Date")
                .is_ok()
        );

        let err = parse_header("name,category,quantity,unit,price").unwrap_err();
        assert!(err.to_string().contains("restock_threshold"));
    }

    #[test]
    fn rows_parse_positionally_from_the_header() {
        let columns = parse_header("name,category,quantity,unit,restock_threshold,price").unwrap();
        let row = parse_row(&columns, "Paneer, Dairy ,500,g,100,0.4").unwrap();
        assert_eq!(row.name, "Paneer");
        assert_eq!(row.category, "Dairy");
        assert_eq!(row.quantity, dec!(500));
        assert_eq!(row.restock_threshold, dec!(100));
        assert_eq!(row.expiry_date, None);
    }

    #[test]
    fn expiry_date_is_optional() {
        let columns =
            parse_header("name,category,quantity,unit,restock_threshold,price,expiry_date")
                .unwrap();
        let with = parse_row(&columns, "Cream,Dairy,150,ml,30,0.2,2026-09-01").unwrap();
        assert_eq!(
            with.expiry_date,
            Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
        );
        let without = parse_row(&columns, "Cream,Dairy,150,ml,30,0.2,").unwrap();
        assert_eq!(without.expiry_date, None);
    }

    #[test]
    fn bad_rows_report_what_failed() {
        let columns = parse_header("name,category,quantity,unit,restock_threshold,price").unwrap();
        assert!(parse_row(&columns, ",Dairy,500,g,100,0.4")
            .unwrap_err()
            .contains("name"));
        assert!(parse_row(&columns, "Paneer,Dairy,lots,g,100,0.4")
            .unwrap_err()
            .contains("quantity"));
        assert!(parse_row(&columns, "Paneer,Dairy,500")
            .unwrap_err()
            .contains("fields"));
    }
}
