mod common;

use axum::http::StatusCode;
use common::{data, money, TestApp};
use rust_decimal_macros::dec;

#[tokio::test]
async fn import_isolates_bad_rows_and_reports_line_numbers() {
    let app = TestApp::new().await;

    let body = "\
name,category,quantity,unit,restock_threshold,price,expiry_date
Paneer,Dairy,500,g,100,0.40,2026-09-10
Cream,Dairy,150,ml,30,0.20,
,Dairy,10,g,5,0.10,
Flour,Pantry,lots,g,100,0.05,
Sugar,Pantry,800,g,200,0.03,not-a-date
Salt,Pantry,900,g,100,0.02,";

    let (status, body) = app.post_text("/api/v1/inventory/import", body).await;
    assert_eq!(status, StatusCode::OK);
    let summary = data(&body);
    assert_eq!(summary["imported"], 3);
    assert_eq!(summary["failed"], 3);

    let errors: Vec<String> = summary["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap().to_string())
        .collect();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].starts_with("line 4:") && errors[0].contains("name"));
    assert!(errors[1].starts_with("line 5:") && errors[1].contains("quantity"));
    assert!(errors[2].starts_with("line 6:") && errors[2].contains("expiry_date"));

    // The good rows landed with their parsed values.
    let (_, body) = app.get("/api/v1/inventory").await;
    let items = data(&body).as_array().unwrap().clone();
    assert_eq!(items.len(), 3);
    let paneer = items.iter().find(|i| i["name"] == "Paneer").unwrap();
    assert_eq!(money(&paneer["quantity"]), dec!(500));
    assert_eq!(money(&paneer["restock_threshold"]), dec!(100));
    assert_eq!(paneer["expiry_date"], "2026-09-10");
}

#[tokio::test]
async fn import_rejects_a_body_without_the_required_header() {
    let app = TestApp::new().await;

    let (status, _) = app.post_text("/api/v1/inventory/import", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_text(
            "/api/v1/inventory/import",
            "name,category,quantity,unit,price\nPaneer,Dairy,500,g,0.40",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn categories_resolve_case_insensitively_across_imports() {
    let app = TestApp::new().await;

    let first = "\
name,category,quantity,unit,restock_threshold,price
Paneer,Dairy,500,g,100,0.40";
    let (status, _) = app.post_text("/api/v1/inventory/import", first).await;
    assert_eq!(status, StatusCode::OK);

    let second = "\
name,category,quantity,unit,restock_threshold,price
Cream,DAIRY,150,ml,30,0.20
Butter, dairy ,200,g,50,0.60";
    let (status, body) = app.post_text("/api/v1/inventory/import", second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["imported"], 2);

    // One category, with the casing of its first appearance.
    let (_, body) = app.get("/api/v1/inventory/categories").await;
    let categories = data(&body).as_array().unwrap().clone();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "Dairy");

    let category_id = categories[0]["id"].as_str().unwrap();
    let (_, body) = app
        .get(&format!("/api/v1/inventory?category_id={category_id}"))
        .await;
    assert_eq!(data(&body).as_array().unwrap().len(), 3);
}
