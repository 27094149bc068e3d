//! Sales and purchase orders and the stock they move.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use stockroom_api::{
    entities::purchase_order::PurchaseOrderStatus,
    errors::ServiceError,
    services::{
        inventory::FulfillmentPolicy,
        orders::{CreateOrderInput, OrderLine},
        purchase_orders::CreatePurchaseOrderInput,
    },
};
use uuid::Uuid;

fn line(item_id: Uuid, quantity: i32, unit_price: rust_decimal::Decimal) -> OrderLine {
    OrderLine {
        item_id,
        quantity,
        unit_price,
    }
}

#[tokio::test]
async fn order_deducts_stock_and_records_total() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let widget = app.create_item("Widget", dec!(2.5)).await;
    let gadget = app.create_item("Gadget", dec!(10)).await;
    let warehouse = app.create_warehouse("Main").await;
    app.stock(widget.id, warehouse.id, 10).await;
    app.stock(gadget.id, warehouse.id, 3).await;

    let (status, body) = app
        .post(
            "/api/orders",
            &token,
            json!({
                "warehouse_id": warehouse.id,
                "payment_method": "card",
                "items": [
                    { "item_id": widget.id, "quantity": 4, "unit_price": "2.50" },
                    { "item_id": gadget.id, "quantity": 1, "unit_price": "10" }
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "Completed");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(6));
    assert_eq!(app.quantity(gadget.id, warehouse.id).await, Some(2));

    let order_id = body["id"].as_str().unwrap().to_string();
    let (status, fetched) = app.get(&format!("/api/orders/{order_id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["payment_method"], "card");
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_order() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("buyer").await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let gadget = app.create_item("Gadget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    app.stock(widget.id, warehouse.id, 10).await;
    app.stock(gadget.id, warehouse.id, 1).await;

    let err = app
        .state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            warehouse_id: Some(warehouse.id),
            payment_method: "cash".into(),
            items: vec![line(widget.id, 5, dec!(1)), line(gadget.id, 2, dec!(1))],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(10));
    assert_eq!(app.quantity(gadget.id, warehouse.id).await, Some(1));

    let token = app.admin_token().await;
    let (_, orders) = app.get("/api/orders", &token).await;
    assert_eq!(orders["pagination"]["total"], 0);
}

#[tokio::test]
async fn out_of_range_total_is_rejected_before_stock_moves() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("buyer").await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    let supplier = app.create_supplier("Acme").await;
    app.stock(widget.id, warehouse.id, 1000).await;
    let huge = rust_decimal::Decimal::from_i128_with_scale(10_i128.pow(28), 0);

    let err = app
        .state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            warehouse_id: Some(warehouse.id),
            payment_method: "card".into(),
            items: vec![line(widget.id, 100, huge)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(1000));

    let err = app
        .state
        .services
        .purchase_orders
        .create(CreatePurchaseOrderInput {
            supplier_id: supplier.id,
            warehouse_id: warehouse.id,
            items: vec![line(widget.id, 100, huge)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let token = app.admin_token().await;
    let (_, orders) = app.get("/api/orders", &token).await;
    assert_eq!(orders["pagination"]["total"], 0);
}

#[tokio::test]
async fn order_without_warehouse_uses_any_record_with_enough_stock() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("buyer").await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let small = app.create_warehouse("Small").await;
    let large = app.create_warehouse("Large").await;
    app.stock(widget.id, small.id, 2).await;
    app.stock(widget.id, large.id, 8).await;

    app.state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            warehouse_id: None,
            payment_method: "card".into(),
            items: vec![line(widget.id, 5, dec!(1))],
        })
        .await
        .unwrap();

    assert_eq!(app.quantity(widget.id, small.id).await, Some(2));
    assert_eq!(app.quantity(widget.id, large.id).await, Some(3));
}

#[tokio::test]
async fn explicit_policy_requires_a_warehouse() {
    let app = TestApp::with_config(|cfg| {
        cfg.fulfillment_policy = FulfillmentPolicy::ExplicitWarehouse;
    })
    .await;
    let (user_id, _) = app.register("buyer").await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    app.stock(widget.id, warehouse.id, 5).await;

    let err = app
        .state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            warehouse_id: None,
            payment_method: "card".into(),
            items: vec![line(widget.id, 1, dec!(1))],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(5));
}

#[tokio::test]
async fn empty_or_malformed_orders_are_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let widget = app.create_item("Widget", dec!(1)).await;

    let (status, _) = app
        .post(
            "/api/orders",
            &token,
            json!({ "payment_method": "card", "items": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/orders",
            &token,
            json!({
                "payment_method": "card",
                "items": [{ "item_id": widget.id, "quantity": 0, "unit_price": "1" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/orders", &token, json!({ "items": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn receiving_a_purchase_order_books_stock_once() {
    let app = TestApp::new().await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    let supplier = app.create_supplier("Acme").await;
    let purchase_orders = &app.state.services.purchase_orders;

    let created = purchase_orders
        .create(CreatePurchaseOrderInput {
            supplier_id: supplier.id,
            warehouse_id: warehouse.id,
            items: vec![line(widget.id, 12, dec!(0.5))],
        })
        .await
        .unwrap();
    assert_eq!(created.purchase_order.status, PurchaseOrderStatus::Pending);
    assert_eq!(app.quantity(widget.id, warehouse.id).await, None);

    let id = created.purchase_order.id;
    let received = purchase_orders
        .update_status(id, PurchaseOrderStatus::Received)
        .await
        .unwrap();
    assert_eq!(received.status, PurchaseOrderStatus::Received);
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(12));

    let again = purchase_orders
        .update_status(id, PurchaseOrderStatus::Received)
        .await
        .unwrap_err();
    assert_matches!(again, ServiceError::InvalidStateTransition { .. });
    assert_eq!(app.quantity(widget.id, warehouse.id).await, Some(12));

    assert_matches!(
        purchase_orders
            .update_status(id, PurchaseOrderStatus::Cancelled)
            .await,
        Err(ServiceError::InvalidStateTransition { .. })
    );
}

#[tokio::test]
async fn purchase_order_status_over_http() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let widget = app.create_item("Widget", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    let supplier = app.create_supplier("Acme").await;

    let (status, created) = app
        .post(
            "/api/purchase-orders",
            &token,
            json!({
                "supplier_id": supplier.id,
                "warehouse_id": warehouse.id,
                "items": [{ "item_id": widget.id, "quantity": 3, "unit_price": "2" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let id = created["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/purchase-orders/{id}/status");

    let (status, page) = app.get("/api/purchase-orders", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"][0]["id"], created["id"]);
    assert_eq!(page["items"][0]["items"][0]["item_id"], widget.id.to_string());
    assert_eq!(page["items"][0]["items"][0]["quantity"], 3);

    let (status, _) = app
        .put(&status_uri, &token, json!({ "status": "Shipped" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&status_uri, &token, json!({ "status": "Cancelled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.quantity(widget.id, warehouse.id).await, None);

    let (status, _) = app
        .put(&status_uri, &token, json!({ "status": "Received" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .delete(&format!("/api/purchase-orders/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/purchase-orders/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
