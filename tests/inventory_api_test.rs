//! Inventory endpoints over HTTP.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn add_transfer_and_list() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let item = app.create_item("Widget", dec!(1)).await;
    let a = app.create_warehouse("A").await;
    let b = app.create_warehouse("B").await;

    let (status, record) = app
        .post(
            "/api/inventory/add",
            &token,
            json!({ "item_id": item.id, "warehouse_id": a.id, "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{record}");
    assert_eq!(record["quantity"], 5);

    let (status, outcome) = app
        .post(
            "/api/inventory/transfer",
            &token,
            json!({
                "item_id": item.id,
                "from_warehouse_id": a.id,
                "to_warehouse_id": b.id,
                "quantity": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["source"]["quantity"], 2);
    assert_eq!(outcome["destination"]["quantity"], 3);

    let (status, body) = app
        .post(
            "/api/inventory/transfer",
            &token,
            json!({
                "item_id": item.id,
                "from_warehouse_id": a.id,
                "to_warehouse_id": b.id,
                "quantity": 10
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient stock"));

    let (status, page) = app
        .get(&format!("/api/inventory?warehouse_id={}", b.id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["items"][0]["quantity"], 3);
    assert_eq!(page["items"][0]["item"]["name"], "Widget");
    assert_eq!(page["items"][0]["warehouse"]["name"], "B");

    let (_, page) = app
        .get(&format!("/api/inventory?item_id={}", item.id), &token)
        .await;
    assert_eq!(page["pagination"]["total"], 2);
}

#[tokio::test]
async fn set_and_delete_a_record() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let item = app.create_item("Widget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    let record = app
        .state
        .services
        .ledger
        .add_stock(item.id, warehouse.id, 9)
        .await
        .unwrap();
    let uri = format!("/api/inventory/{}", record.id);

    let (status, _) = app.put(&uri, &token, json!({ "quantity": -2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app.put(&uri, &token, json!({ "quantity": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 4);

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutations_need_inventory_write() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;

    let (status, _) = app.get("/api/inventory", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/inventory/add",
            &token,
            json!({ "item_id": Uuid::new_v4(), "warehouse_id": Uuid::new_v4(), "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn add_to_unknown_item_is_not_found() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let warehouse = app.create_warehouse("Main").await;

    let (status, _) = app
        .post(
            "/api/inventory/add",
            &token,
            json!({ "item_id": Uuid::new_v4(), "warehouse_id": warehouse.id, "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
