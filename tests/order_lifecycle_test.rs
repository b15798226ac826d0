mod common;

use axum::http::StatusCode;
use common::{data, money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn seed_menu_item(app: &TestApp, name: &str, price: &str) -> (String, String) {
    let (status, body) = app
        .post("/api/v1/menu/categories", json!({"name": "Mains"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let category_id = data(&body)["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/v1/menu/items",
            json!({"name": name, "price": price, "category_id": category_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let item_id = data(&body)["id"].as_str().unwrap().to_string();
    (category_id, item_id)
}

async fn seed_table(app: &TestApp, number: i32) -> String {
    let (status, body) = app
        .post("/api/v1/tables", json!({"number": number, "seats": 4}))
        .await;
    assert_eq!(status, StatusCode::OK);
    data(&body)["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn order_creation_snapshots_prices_and_occupies_the_table() {
    let app = TestApp::new().await;
    let (_, item_id) = seed_menu_item(&app, "Paneer Curry", "200.00").await;
    let table_id = seed_table(&app, 1).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            json!({
                "table_id": table_id,
                "items": [{"menu_item_id": item_id, "quantity": 2}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let order = data(&body);
    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["subtotal"]), dec!(400.00));
    assert_eq!(money(&order["total"]), dec!(400.00));
    assert_eq!(money(&order["items"][0]["price"]), dec!(200.00));

    // Raising the menu price later must not touch the captured line price.
    let (status, _) = app
        .put(
            &format!("/api/v1/menu/items/{item_id}"),
            json!({"price": "250.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = order["id"].as_str().unwrap();
    let (_, body) = app.get(&format!("/api/v1/orders/{order_id}")).await;
    assert_eq!(money(&data(&body)["items"][0]["price"]), dec!(200.00));

    let (_, body) = app.get(&format!("/api/v1/tables/{table_id}")).await;
    assert_eq!(data(&body)["status"], "occupied");
}

#[tokio::test]
async fn order_creation_rejects_bad_input() {
    let app = TestApp::new().await;
    let (_, item_id) = seed_menu_item(&app, "Soup", "120.00").await;
    let table_id = seed_table(&app, 2).await;

    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({"table_id": table_id, "items": []}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({
                "table_id": table_id,
                "items": [{"menu_item_id": item_id, "quantity": 0}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unavailable dishes cannot be ordered.
    let (status, _) = app
        .put(
            &format!("/api/v1/menu/items/{item_id}"),
            json!({"is_available": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post(
            "/api/v1/orders",
            json!({
                "table_id": table_id,
                "items": [{"menu_item_id": item_id, "quantity": 1}],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_progression_is_strictly_forward() {
    let app = TestApp::new().await;
    let (_, item_id) = seed_menu_item(&app, "Naan", "40.00").await;
    let table_id = seed_table(&app, 3).await;

    let (_, body) = app
        .post(
            "/api/v1/orders",
            json!({
                "table_id": table_id,
                "items": [{"menu_item_id": item_id, "quantity": 1}],
            }),
        )
        .await;
    let order_id = data(&body)["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/v1/orders/{order_id}/status");

    // Skipping a step is rejected.
    let (status, _) = app.put(&status_uri, json!({"status": "ready"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for next in ["preparing", "ready", "served"] {
        let (status, body) = app.put(&status_uri, json!({"status": next})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(data(&body)["status"], next);
    }

    // Going backwards is rejected, and paid belongs to settlement.
    let (status, _) = app.put(&status_uri, json!({"status": "ready"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.put(&status_uri, json!({"status": "paid"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_to_billing_requires_served_orders_and_is_idempotent() {
    let app = TestApp::new().await;
    let (_, item_id) = seed_menu_item(&app, "Dal", "150.00").await;
    let table_id = seed_table(&app, 4).await;
    let billing_uri = format!("/api/v1/tables/{table_id}/send-to-billing");

    let (status, _) = app.post_empty(&billing_uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .post(
            "/api/v1/orders",
            json!({
                "table_id": table_id,
                "items": [{"menu_item_id": item_id, "quantity": 2}],
            }),
        )
        .await;
    let order_id = data(&body)["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/v1/orders/{order_id}/status");
    for next in ["preparing", "ready", "served"] {
        app.put(&status_uri, json!({"status": next})).await;
    }

    let (status, body) = app.post_empty(&billing_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&data(&body)["total_amount"]), dec!(300.00));

    let (_, body) = app.get(&format!("/api/v1/tables/{table_id}")).await;
    assert_eq!(data(&body)["status"], "bill-pending");

    // Retrying creates no second pending payment.
    let (status, _) = app.post_empty(&billing_uri).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/v1/billing/pending").await;
    let bills = data(&body).as_array().unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0]["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn manual_table_overrides_are_limited_to_reservations() {
    let app = TestApp::new().await;
    let table_id = seed_table(&app, 5).await;
    let status_uri = format!("/api/v1/tables/{table_id}/status");

    let (status, body) = app.put(&status_uri, json!({"status": "reserved"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "reserved");

    let (status, _) = app.put(&status_uri, json!({"status": "bill-pending"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.put(&status_uri, json!({"status": "free"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["status"], "free");
}
