//! Reports and role administration.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Days, TimeZone, Utc};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use stockroom_api::{
    entities::order::{self, OrderStatus},
    services::{
        orders::{CreateOrderInput, OrderLine},
        purchase_orders::CreatePurchaseOrderInput,
    },
};
use uuid::Uuid;

fn as_number(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.as_f64().expect("number"),
    }
}

#[tokio::test]
async fn financial_report_nets_sales_against_purchases() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let (user_id, _) = app.register("buyer").await;
    let item = app.create_item("Widget", dec!(10)).await;
    let warehouse = app.create_warehouse("Main").await;
    let supplier = app.create_supplier("Acme").await;
    app.stock(item.id, warehouse.id, 10).await;

    app.state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id,
            warehouse_id: Some(warehouse.id),
            payment_method: "card".into(),
            items: vec![OrderLine {
                item_id: item.id,
                quantity: 3,
                unit_price: dec!(10),
            }],
        })
        .await
        .unwrap();
    app.state
        .services
        .purchase_orders
        .create(CreatePurchaseOrderInput {
            supplier_id: supplier.id,
            warehouse_id: warehouse.id,
            items: vec![OrderLine {
                item_id: item.id,
                quantity: 4,
                unit_price: dec!(2),
            }],
        })
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let uri = format!(
        "/api/reports/financial?start_date={}&end_date={}",
        today, today
    );
    let (status, report) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(as_number(&report["revenue"]), 30.0);
    assert_eq!(as_number(&report["cost"]), 8.0);
    assert_eq!(as_number(&report["net_profit"]), 22.0);

    // A window that ends before today sees nothing
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap();
    let (_, empty) = app
        .get(
            &format!(
                "/api/reports/financial?start_date={}&end_date={}",
                yesterday, yesterday
            ),
            &token,
        )
        .await;
    assert_eq!(as_number(&empty["revenue"]), 0.0);

    let (status, days) = app.get("/api/reports/sales", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(days[0]["order_count"], 1);
    assert_eq!(days[0]["date"], today.to_string());
}

async fn record_order_at(app: &TestApp, user_id: Uuid, at: DateTime<Utc>, total: Decimal) {
    order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        warehouse_id: Set(None),
        total_amount: Set(total),
        status: Set(OrderStatus::Completed),
        payment_method: Set("card".into()),
        date: Set(at),
        created_at: Set(at),
    }
    .insert(&*app.state.db)
    .await
    .expect("insert order");
}

#[tokio::test]
async fn sales_report_groups_by_utc_day() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let (user_id, _) = app.register("buyer").await;
    record_order_at(&app, user_id, Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap(), dec!(5)).await;
    record_order_at(&app, user_id, Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap(), dec!(10.5)).await;
    record_order_at(&app, user_id, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), dec!(4.5)).await;

    let (status, days) = app.get("/api/reports/sales", &token).await;
    assert_eq!(status, StatusCode::OK, "{days}");
    assert_eq!(days.as_array().map(Vec::len), Some(2));
    assert_eq!(days[0]["date"], "2024-03-01");
    assert_eq!(days[0]["order_count"], 2);
    assert_eq!(as_number(&days[0]["total_sales"]), 15.0);
    assert_eq!(days[1]["date"], "2024-03-02");
    assert_eq!(days[1]["order_count"], 1);

    let (_, report) = app
        .get(
            "/api/reports/financial?start_date=2024-03-01&end_date=2024-03-01",
            &token,
        )
        .await;
    assert_eq!(as_number(&report["revenue"]), 15.0);
    assert_eq!(as_number(&report["cost"]), 0.0);
}

#[tokio::test]
async fn financial_report_requires_valid_dates() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .get("/api/reports/financial?start_date=yesterday&end_date=2024-01-01", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error: Invalid start_date format");

    let (status, _) = app
        .get("/api/reports/financial?start_date=2024-01-01", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_counts_low_stock() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let a = app.create_item("A", dec!(1)).await;
    let b = app.create_item("B", dec!(1)).await;
    let warehouse = app.create_warehouse("Main").await;
    app.stock(a.id, warehouse.id, 3).await;
    app.stock(b.id, warehouse.id, 50).await;

    let (status, summary) = app.get("/api/reports/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["items"], 2);
    assert_eq!(summary["warehouses"], 1);
    assert_eq!(summary["users"], 1);
    assert_eq!(summary["low_stock"], 1);
}

#[tokio::test]
async fn staff_cannot_read_reports_without_a_grant() {
    let app = TestApp::new().await;
    let token = app.token_with_permissions("clerk", &["items:read"]).await;
    let (status, _) = app.get("/api/reports/dashboard", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn roles_can_be_built_and_assigned_over_http() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (user_id, user_token) = app.register("picker").await;

    let (status, role) = app
        .post(
            "/api/rbac/roles",
            &admin,
            json!({ "name": "picker", "description": "Moves stock" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{role}");

    let (status, _) = app
        .post("/api/rbac/roles", &admin, json!({ "name": "picker" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, permission) = app
        .post(
            "/api/rbac/permissions",
            &admin,
            json!({ "resource": "inventory", "action": "write" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{permission}");

    let role_id = role["id"].as_str().unwrap();
    let (status, granted) = app
        .post(
            &format!("/api/rbac/roles/{role_id}/permissions"),
            &admin,
            json!({ "permission_ids": [permission["id"]] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(granted["permissions"].as_array().map(Vec::len), Some(1));

    let (status, user) = app
        .post(
            &format!("/api/rbac/users/{user_id}/role"),
            &admin,
            json!({ "role_id": role_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role_id"], role["id"]);

    // Permissions are loaded per request, so the existing token picks them up
    let (_, me) = app.get("/api/me", &user_token).await;
    assert_eq!(me["permissions"], json!(["inventory:write"]));
    let (status, _) = app.get("/api/inventory", &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/rbac/roles", &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
