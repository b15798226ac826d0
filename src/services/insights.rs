use crate::{
    clients::LlmClient,
    db::DbPool,
    entities::menu_item::{self, Entity as MenuItemEntity},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    entities::payment::{self, Entity as PaymentEntity, Model as PaymentModel, PaymentStatus},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentMethodBreakdown {
    pub method: String,
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TopSellingItem {
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Locally computed aggregates over recent completed payments. This is
/// the only input handed to the text-generation endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BillingSummary {
    pub payment_count: usize,
    pub total_revenue: Decimal,
    pub average_ticket: Decimal,
    pub payment_methods: Vec<PaymentMethodBreakdown>,
    pub top_items: Vec<TopSellingItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BillingInsightsResponse {
    pub summary: BillingSummary,
    pub insights: String,
}

/// Aggregates completed payments into the summary the insight prompt is
/// built from. `item_names` maps menu item ids to display names.
pub fn summarize_payments(
    payments: &[PaymentModel],
    items: &[OrderItemModel],
    item_names: &HashMap<Uuid, String>,
) -> BillingSummary {
    let payment_count = payments.len();
    let total_revenue: Decimal = payments.iter().map(|p| p.amount).sum();
    let average_ticket = if payment_count > 0 {
        (total_revenue / Decimal::from(payment_count as u64)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let mut by_method: HashMap<String, (usize, Decimal)> = HashMap::new();
    for p in payments {
        let entry = by_method
            .entry(p.payment_method.clone())
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += p.amount;
    }
    let mut payment_methods: Vec<PaymentMethodBreakdown> = by_method
        .into_iter()
        .map(|(method, (count, amount))| PaymentMethodBreakdown {
            method,
            count,
            amount,
        })
        .collect();
    payment_methods.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut by_item: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
    for item in items {
        let entry = by_item
            .entry(item.menu_item_id)
            .or_insert((0, Decimal::ZERO));
        entry.0 += i64::from(item.quantity);
        entry.1 += item.price * Decimal::from(item.quantity);
    }
    let mut top_items: Vec<TopSellingItem> = by_item
        .into_iter()
        .map(|(id, (quantity, revenue))| TopSellingItem {
            name: item_names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            quantity,
            revenue,
        })
        .collect();
    top_items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.name.cmp(&b.name)));
    top_items.truncate(5);

    BillingSummary {
        payment_count,
        total_revenue,
        average_ticket,
        payment_methods,
        top_items,
    }
}

/// Service producing billing insights: local aggregation plus one call
/// to the external text-generation endpoint.
#[derive(Clone)]
pub struct InsightsService {
    db_pool: Arc<DbPool>,
    llm: Arc<LlmClient>,
    history_limit: u64,
}

impl InsightsService {
    pub fn new(db_pool: Arc<DbPool>, llm: Arc<LlmClient>, history_limit: u64) -> Self {
        Self {
            db_pool,
            llm,
            history_limit,
        }
    }

    #[instrument(skip(self))]
    pub async fn billing_insights(&self) -> Result<BillingInsightsResponse, ServiceError> {
        let payments = PaymentEntity::find()
            .filter(payment::Column::Status.eq(PaymentStatus::Completed.as_str()))
            .order_by_desc(payment::Column::UpdatedAt)
            .limit(self.history_limit)
            .all(&*self.db_pool)
            .await?;

        let order_ids: Vec<Uuid> = payments.iter().map(|p| p.order_id).collect();
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(&*self.db_pool)
            .await?;

        let menu_item_ids: Vec<Uuid> = items.iter().map(|i| i.menu_item_id).collect();
        let item_names: HashMap<Uuid, String> = MenuItemEntity::find()
            .filter(menu_item::Column::Id.is_in(menu_item_ids))
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        let summary = summarize_payments(&payments, &items, &item_names);

        let prompt = serde_json::to_string(&summary)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        let insights = self
            .llm
            .complete(
                "You are a restaurant business analyst. Given aggregated billing data as JSON, \
                 write a short plain-text summary of revenue patterns and one or two \
                 actionable observations.",
                &prompt,
            )
            .await?;

        Ok(BillingInsightsResponse { summary, insights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn completed_payment(amount: Decimal, method: &str) -> PaymentModel {
        PaymentModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            amount,
            payment_method: method.to_string(),
            status: "completed".to_string(),
            transaction_id: None,
            created_at: Utc::now(),
            updated_at: Some(Utc::now()),
        }
    }

    fn line(menu_item_id: Uuid, quantity: i32, price: Decimal) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            menu_item_id,
            quantity,
            price,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_totals_and_average() {
        let payments = vec![
            completed_payment(dec!(180.00), "cash"),
            completed_payment(dec!(120.00), "card"),
            completed_payment(dec!(60.00), "cash"),
        ];
        let summary = summarize_payments(&payments, &[], &HashMap::new());

        assert_eq!(summary.payment_count, 3);
        assert_eq!(summary.total_revenue, dec!(360.00));
        assert_eq!(summary.average_ticket, dec!(120.00));

        assert_eq!(summary.payment_methods[0].method, "cash");
        assert_eq!(summary.payment_methods[0].count, 2);
        assert_eq!(summary.payment_methods[0].amount, dec!(240.00));
    }

    #[test]
    fn top_items_rank_by_quantity() {
        let curry = Uuid::new_v4();
        let naan = Uuid::new_v4();
        let items = vec![
            line(curry, 2, dec!(200)),
            line(naan, 4, dec!(40)),
            line(curry, 1, dec!(200)),
        ];
        let names = HashMap::from([
            (curry, "Paneer Curry".to_string()),
            (naan, "Butter Naan".to_string()),
        ]);

        let summary = summarize_payments(&[], &items, &names);
        assert_eq!(summary.top_items[0].name, "Butter Naan");
        assert_eq!(summary.top_items[0].quantity, 4);
        assert_eq!(summary.top_items[1].name, "Paneer Curry");
        assert_eq!(summary.top_items[1].revenue, dec!(600));
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let summary = summarize_payments(&[], &[], &HashMap::new());
        assert_eq!(summary.payment_count, 0);
        assert_eq!(summary.average_ticket, Decimal::ZERO);
        assert!(summary.top_items.is_empty());
    }
}
