use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Notifications emitted when orders, payments, tables or inventory change.
/// Consumers (push feeds, dashboards) attach to the receiving end of the
/// channel; the service layer only ever sees [`EventSender`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        table_id: Uuid,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderSentToBilling {
        order_id: Uuid,
        table_id: Uuid,
        amount: Decimal,
    },
    PaymentCompleted {
        payment_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
        payment_method: String,
    },
    TableStatusChanged {
        table_id: Uuid,
        old_status: String,
        new_status: String,
    },
    InventoryDeducted {
        inventory_item_id: Uuid,
        quantity: Decimal,
        remaining: Decimal,
    },
    InventoryRestocked {
        inventory_item_id: Uuid,
        quantity: Decimal,
        new_quantity: Decimal,
    },
    LowStock {
        inventory_item_id: Uuid,
        name: String,
        quantity: Decimal,
        restock_threshold: Decimal,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Failure means the consumer loop is
    /// gone; callers log and continue rather than failing the request.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumer loop. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                table_id,
                total,
            } => {
                info!(%order_id, %table_id, %total, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, old_status, new_status, "order status changed");
            }
            Event::OrderSentToBilling {
                order_id,
                table_id,
                amount,
            } => {
                info!(%order_id, %table_id, %amount, "order sent to billing");
            }
            Event::PaymentCompleted {
                payment_id,
                order_id,
                amount,
                payment_method,
            } => {
                info!(%payment_id, %order_id, %amount, payment_method, "payment completed");
            }
            Event::TableStatusChanged {
                table_id,
                old_status,
                new_status,
            } => {
                info!(%table_id, old_status, new_status, "table status changed");
            }
            Event::InventoryDeducted {
                inventory_item_id,
                quantity,
                remaining,
            } => {
                info!(%inventory_item_id, %quantity, %remaining, "inventory deducted");
            }
            Event::InventoryRestocked {
                inventory_item_id,
                quantity,
                new_quantity,
            } => {
                info!(%inventory_item_id, %quantity, %new_quantity, "inventory restocked");
            }
            Event::LowStock {
                inventory_item_id,
                name,
                quantity,
                restock_threshold,
                ..
            } => {
                warn!(
                    %inventory_item_id,
                    name,
                    %quantity,
                    %restock_threshold,
                    "inventory item at or below restock threshold"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated {
                order_id: Uuid::new_v4(),
                table_id: Uuid::new_v4(),
                total: dec!(420.00),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated { total, .. }) => assert_eq!(total, dec!(420.00)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender
            .send(Event::TableStatusChanged {
                table_id: Uuid::new_v4(),
                old_status: "occupied".into(),
                new_status: "bill-pending".into(),
            })
            .await;
        assert!(result.is_err());
    }
}
