mod common;

use axum::http::StatusCode;
use common::{data, money, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

struct Kitchen {
    table_id: String,
    curry_id: String,
    naan_id: String,
    paneer_id: String,
    cream_id: String,
    flour_id: String,
}

async fn seed_ingredient(
    app: &TestApp,
    category_id: &str,
    name: &str,
    quantity: &str,
    unit: &str,
) -> String {
    let (status, body) = app
        .post(
            "/api/v1/inventory",
            json!({
                "name": name,
                "category_id": category_id,
                "quantity": quantity,
                "unit": unit,
                "restock_threshold": "60",
                "price": "1.00",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    data(&body)["id"].as_str().unwrap().to_string()
}

/// Seeds a table, ingredients (paneer 500 g, cream 150 ml, flour 500 g),
/// and two dishes: curry (80 g paneer + 20 ml cream per serving, 200.00)
/// and naan (40 g flour per serving, 40.00).
async fn seed_kitchen(app: &TestApp) -> Kitchen {
    let (_, body) = app
        .post("/api/v1/tables", json!({"number": 7, "seats": 4}))
        .await;
    let table_id = data(&body)["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .post("/api/v1/inventory/categories", json!({"name": "Pantry"}))
        .await;
    let pantry_id = data(&body)["id"].as_str().unwrap().to_string();

    let paneer_id = seed_ingredient(app, &pantry_id, "Paneer", "500", "g").await;
    let cream_id = seed_ingredient(app, &pantry_id, "Cream", "150", "ml").await;
    let flour_id = seed_ingredient(app, &pantry_id, "Flour", "500", "g").await;

    let (_, body) = app
        .post("/api/v1/menu/categories", json!({"name": "Mains"}))
        .await;
    let mains_id = data(&body)["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .post(
            "/api/v1/menu/items",
            json!({"name": "Paneer Curry", "price": "200.00", "category_id": mains_id}),
        )
        .await;
    let curry_id = data(&body)["id"].as_str().unwrap().to_string();
    let (_, body) = app
        .post(
            "/api/v1/menu/items",
            json!({"name": "Butter Naan", "price": "40.00", "category_id": mains_id}),
        )
        .await;
    let naan_id = data(&body)["id"].as_str().unwrap().to_string();

    for (item, ingredient, qty) in [
        (&curry_id, &paneer_id, "80"),
        (&curry_id, &cream_id, "20"),
        (&naan_id, &flour_id, "40"),
    ] {
        let (status, _) = app
            .put(
                &format!("/api/v1/menu/items/{item}/recipe"),
                json!({"inventory_item_id": ingredient, "quantity_required": qty}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    Kitchen {
        table_id,
        curry_id,
        naan_id,
        paneer_id,
        cream_id,
        flour_id,
    }
}

async fn place_served_order(app: &TestApp, table_id: &str, lines: Value) {
    let (status, body) = app
        .post(
            "/api/v1/orders",
            json!({"table_id": table_id, "items": lines}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = data(&body)["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/v1/orders/{order_id}/status");
    for next in ["preparing", "ready", "served"] {
        let (status, _) = app.put(&status_uri, json!({"status": next})).await;
        assert_eq!(status, StatusCode::OK);
    }
}

async fn item_quantity(app: &TestApp, item_id: &str) -> Decimal {
    let (_, body) = app.get(&format!("/api/v1/inventory/{item_id}")).await;
    money(&data(&body)["quantity"])
}

#[tokio::test]
async fn settlement_deducts_aggregated_usage_and_frees_the_table() {
    let app = TestApp::new().await;
    let k = seed_kitchen(&app).await;

    // Two orders: curry appears on both (2 + 3 servings) and naan on one
    // (6 servings). Expected usage: paneer 5*80=400, cream 5*20=100,
    // flour 6*40=240.
    place_served_order(
        &app,
        &k.table_id,
        json!([
            {"menu_item_id": k.curry_id, "quantity": 2},
            {"menu_item_id": k.naan_id, "quantity": 6},
        ]),
    )
    .await;
    place_served_order(
        &app,
        &k.table_id,
        json!([{"menu_item_id": k.curry_id, "quantity": 3}]),
    )
    .await;

    let (status, _) = app
        .post_empty(&format!("/api/v1/tables/{}/send-to-billing", k.table_id))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Advisory check: everything is coverable.
    let (status, body) = app
        .get(&format!("/api/v1/billing/{}/feasibility", k.table_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["feasible"], true);

    let (status, body) = app
        .post(
            &format!("/api/v1/billing/{}/settle", k.table_id),
            json!({"discount_percent": "10", "payment_method": "cash"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let settlement = data(&body);

    // Order totals 640.00 and 600.00; 10% off each, summed.
    assert_eq!(money(&settlement["final_amount"]), dec!(1116.00));
    assert_eq!(settlement["orders_paid"].as_array().unwrap().len(), 2);

    let deductions = settlement["deductions"].as_array().unwrap();
    assert_eq!(deductions.len(), 3);
    let by_name = |name: &str| {
        deductions
            .iter()
            .find(|d| d["name"] == name)
            .unwrap_or_else(|| panic!("no deduction for {name}"))
    };
    assert_eq!(money(&by_name("Paneer")["deducted"]), dec!(400));
    assert_eq!(money(&by_name("Paneer")["remaining"]), dec!(100));
    assert_eq!(money(&by_name("Cream")["deducted"]), dec!(100));
    assert_eq!(money(&by_name("Cream")["remaining"]), dec!(50));
    assert_eq!(money(&by_name("Flour")["deducted"]), dec!(240));
    assert_eq!(money(&by_name("Flour")["remaining"]), dec!(260));

    assert_eq!(item_quantity(&app, &k.paneer_id).await, dec!(100));
    assert_eq!(item_quantity(&app, &k.cream_id).await, dec!(50));
    assert_eq!(item_quantity(&app, &k.flour_id).await, dec!(260));

    // One usage ledger row per distinct ingredient, with previous/new.
    let (_, body) = app
        .get(&format!("/api/v1/inventory/{}/transactions", k.paneer_id))
        .await;
    let ledger = data(&body).as_array().unwrap().clone();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["transaction_type"], "usage");
    assert_eq!(money(&ledger[0]["previous_quantity"]), dec!(500));
    assert_eq!(money(&ledger[0]["new_quantity"]), dec!(100));

    // Table is free again and the bill screen is empty.
    let (_, body) = app.get(&format!("/api/v1/tables/{}", k.table_id)).await;
    assert_eq!(data(&body)["status"], "free");
    let (_, body) = app.get("/api/v1/billing/pending").await;
    assert!(data(&body).as_array().unwrap().is_empty());

    // Payments are completed with the discounted per-order amounts.
    let (_, body) = app.get("/api/v1/billing/history").await;
    let history = data(&body).as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
    let mut amounts: Vec<Decimal> = history.iter().map(|p| money(&p["amount"])).collect();
    amounts.sort();
    assert_eq!(amounts, vec![dec!(540.00), dec!(576.00)]);
    assert!(history.iter().all(|p| p["status"] == "completed"));
    assert!(history.iter().all(|p| p["payment_method"] == "cash"));
}

#[tokio::test]
async fn insufficient_stock_blocks_settlement_unless_overridden() {
    let app = TestApp::new().await;
    let k = seed_kitchen(&app).await;

    // 7 curries need 560 g paneer against 500 g on hand.
    place_served_order(
        &app,
        &k.table_id,
        json!([{"menu_item_id": k.curry_id, "quantity": 7}]),
    )
    .await;
    app.post_empty(&format!("/api/v1/tables/{}/send-to-billing", k.table_id))
        .await;

    let (status, body) = app
        .get(&format!("/api/v1/billing/{}/feasibility", k.table_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["feasible"], false);
    let warnings = data(&body)["warnings"].as_array().unwrap().clone();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["name"], "Paneer");
    assert_eq!(money(&warnings[0]["required"]), dec!(560));
    assert_eq!(money(&warnings[0]["available"]), dec!(500));

    let settle_uri = format!("/api/v1/billing/{}/settle", k.table_id);
    let (status, _) = app
        .post(
            &settle_uri,
            json!({"discount_percent": "0", "payment_method": "card"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing was deducted by the rejected attempt.
    assert_eq!(item_quantity(&app, &k.paneer_id).await, dec!(500));

    // The explicit override floors stock at zero and the ledger keeps
    // the true deficit.
    let (status, body) = app
        .post(
            &settle_uri,
            json!({
                "discount_percent": "0",
                "payment_method": "card",
                "allow_insufficient_stock": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let paneer = data(&body)["deductions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["name"] == "Paneer")
        .unwrap()
        .clone();
    assert_eq!(money(&paneer["remaining"]), dec!(0));

    assert_eq!(item_quantity(&app, &k.paneer_id).await, dec!(0));
    let (_, body) = app
        .get(&format!("/api/v1/inventory/{}/transactions", k.paneer_id))
        .await;
    let ledger = data(&body).as_array().unwrap().clone();
    assert_eq!(money(&ledger[0]["quantity"]), dec!(560));
    assert_eq!(money(&ledger[0]["previous_quantity"]), dec!(500));
    assert_eq!(money(&ledger[0]["new_quantity"]), dec!(0));

    // Zero stock is at or below the threshold now.
    let (_, body) = app.get("/api/v1/inventory/low-stock").await;
    let low = data(&body).as_array().unwrap().clone();
    assert!(low.iter().any(|i| i["name"] == "Paneer"));
}

#[tokio::test]
async fn a_table_settles_for_only_one_operator_at_a_time() {
    let app = TestApp::new().await;
    let k = seed_kitchen(&app).await;
    place_served_order(
        &app,
        &k.table_id,
        json!([{"menu_item_id": k.curry_id, "quantity": 1}]),
    )
    .await;
    app.post_empty(&format!("/api/v1/tables/{}/send-to-billing", k.table_id))
        .await;

    // Hold the table's settlement lock, standing in for a second
    // operator's in-flight settlement.
    let billing = app.state.services.billing.clone();
    let table_uuid: uuid::Uuid = k.table_id.parse().unwrap();
    let guard = billing.begin_settlement(table_uuid).unwrap();

    let settle_uri = format!("/api/v1/billing/{}/settle", k.table_id);
    let settle_body = json!({"discount_percent": "0", "payment_method": "cash"});
    let (status, _) = app.post(&settle_uri, settle_body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The rejected attempt changed nothing.
    let (_, body) = app.get(&format!("/api/v1/tables/{}", k.table_id)).await;
    assert_eq!(data(&body)["status"], "bill-pending");
    assert_eq!(item_quantity(&app, &k.paneer_id).await, dec!(500));

    // Once the competing settlement finishes, the table settles normally.
    drop(guard);
    let (status, _) = app.post(&settle_uri, settle_body).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/v1/tables/{}", k.table_id)).await;
    assert_eq!(data(&body)["status"], "free");
}

#[tokio::test]
async fn settling_a_table_without_a_bill_is_rejected() {
    let app = TestApp::new().await;
    let (_, body) = app
        .post("/api/v1/tables", json!({"number": 9, "seats": 2}))
        .await;
    let table_id = data(&body)["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            &format!("/api/v1/billing/{table_id}/settle"),
            json!({"discount_percent": "0", "payment_method": "cash"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/api/v1/billing/{table_id}/settle"),
            json!({"discount_percent": "120", "payment_method": "cash"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
