//! Catalog endpoints: items, reference data, list shaping, reviews,
//! favorites and media.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use test_case::test_case;
use uuid::Uuid;

fn names(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|i| i["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn item_crud_round() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, category) = app
        .post("/api/categories", &token, json!({ "name": "Tools" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, item) = app
        .post(
            "/api/items",
            &token,
            json!({ "name": "Hammer", "price": "12.5", "category_id": category["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    assert_eq!(item["viewer_count"], 0);
    let uri = format!("/api/items/{}", item["id"].as_str().unwrap());

    let (status, updated) = app
        .put(&uri, &token, json!({ "name": "Claw hammer" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Claw hammer");
    assert_eq!(updated["category_id"], category["id"]);

    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn viewing_an_item_counts_the_view() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;
    let item = app.create_item("Lamp", dec!(30)).await;
    let uri = format!("/api/items/{}", item.id);

    app.get(&uri, &token).await;
    let (status, body) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["viewer_count"], 2);
}

#[test_case(json!({ "name": "", "price": "1" }) ; "empty name")]
#[test_case(json!({ "name": "Thing", "price": "-1" }) ; "negative price")]
#[test_case(json!({ "name": "Thing" }) ; "missing price")]
#[test_case(json!({ "name": "Thing", "price": "1", "category_id": Uuid::new_v4() }) ; "unknown category")]
#[tokio::test]
async fn invalid_items_are_rejected(payload: Value) {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app.post("/api/items", &token, payload).await;
    assert!(
        status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND,
        "unexpected {status}: {body}"
    );
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_search_sort_and_paging() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;
    for name in ["Bolt", "Anchor", "Cable", "Anvil", "Drill"] {
        app.create_item(name, dec!(1)).await;
    }

    let (_, page) = app.get("/api/items?sort=name&order=desc", &token).await;
    assert_eq!(names(&page), ["Drill", "Cable", "Bolt", "Anvil", "Anchor"]);

    let (_, page) = app.get("/api/items?search=An&sort=name", &token).await;
    assert_eq!(names(&page), ["Anchor", "Anvil"]);
    assert_eq!(page["pagination"]["total"], 2);

    let (_, page) = app
        .get("/api/items?sort=name&page=2&page_size=2", &token)
        .await;
    assert_eq!(names(&page), ["Bolt", "Cable"]);
    assert_eq!(page["pagination"]["total_pages"], 3);

    // Garbage falls back to defaults instead of failing
    let (status, page) = app
        .get("/api/items?page=-4&page_size=abc&sort=secret", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["page"], 1);
    assert_eq!(page["pagination"]["page_size"], 10);

    let (_, page) = app.get("/api/items?page_size=1000", &token).await;
    assert_eq!(page["pagination"]["page_size"], 100);
}

#[tokio::test]
async fn referenced_warehouse_cannot_be_deleted() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let item = app.create_item("Crate", dec!(3)).await;
    let warehouse = app.create_warehouse("Main").await;
    let supplier = app.create_supplier("Acme").await;

    let (status, _) = app
        .post(
            "/api/purchase-orders",
            &token,
            json!({
                "supplier_id": supplier.id,
                "warehouse_id": warehouse.id,
                "items": [{ "item_id": item.id, "quantity": 1, "unit_price": "1" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .delete(&format!("/api/warehouses/{}", warehouse.id), &token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .delete(&format!("/api/suppliers/{}", supplier.id), &token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn warehouse_update_and_unknown_ids() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let warehouse = app.create_warehouse("Main").await;

    let (status, body) = app
        .put(
            &format!("/api/warehouses/{}", warehouse.id),
            &token,
            json!({ "location": "Dock 4", "capacity": 50 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"], "Dock 4");
    assert_eq!(body["capacity"], 50);

    let (status, _) = app
        .put(
            &format!("/api/warehouses/{}", Uuid::new_v4()),
            &token,
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/items/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discounts_validate_percentage_and_dates() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/discounts",
            &token,
            json!({
                "name": "Too much",
                "percentage": "120",
                "start_date": "2024-01-01T00:00:00Z",
                "end_date": "2024-02-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/discounts",
            &token,
            json!({
                "name": "Backwards",
                "percentage": "10",
                "start_date": "2024-02-01T00:00:00Z",
                "end_date": "2024-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/discounts",
            &token,
            json!({
                "name": "Spring",
                "percentage": "15",
                "start_date": "2024-03-01T00:00:00Z",
                "end_date": "2024-03-31T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn reviews_are_attached_to_the_caller() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;
    let item = app.create_item("Kettle", dec!(20)).await;
    let uri = format!("/api/items/{}/reviews", item.id);

    let (status, _) = app
        .post(&uri, &token, json!({ "rating": 6, "comment": "!!" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, review) = app
        .post(&uri, &token, json!({ "rating": 4, "comment": "Boils fast" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{review}");

    let (_, me) = app.get("/api/me", &token).await;
    assert_eq!(review["user_id"], me["id"]);

    let (status, reviews) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .post(
            &format!("/api/items/{}/reviews", Uuid::new_v4()),
            &token,
            json!({ "rating": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorite_toggles_and_tracks_the_count() {
    let app = TestApp::new().await;
    let token = app.staff_token().await;
    let item = app.create_item("Mug", dec!(8)).await;
    let uri = format!("/api/items/{}/favorite", item.id);

    let (status, body) = app.post(&uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Favorited");

    let (_, fetched) = app.get(&format!("/api/items/{}", item.id), &token).await;
    assert_eq!(fetched["favorite_count"], 1);

    let (status, body) = app.post(&uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unfavorited");

    let (_, fetched) = app.get(&format!("/api/items/{}", item.id), &token).await;
    assert_eq!(fetched["favorite_count"], 0);
}

fn multipart_request(uri: &str, token: &str, field: &str) -> Request<Body> {
    let boundary = "stockroom-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"photo.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
        b = boundary,
        f = field
    );
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .expect("valid request")
}

#[tokio::test]
async fn media_upload_records_the_stored_url() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let item = app.create_item("Poster", dec!(5)).await;
    let uri = format!("/api/items/{}/media", item.id);

    let (status, media) = app.send(multipart_request(&uri, &token, "file")).await;
    assert_eq!(status, StatusCode::CREATED, "{media}");
    assert_eq!(media["item_id"], item.id.to_string());
    assert_eq!(media["url"], "https://cdn.test/inventory/items/photo.png");

    let uploads = app.uploader.uploads.lock().unwrap().clone();
    assert_eq!(uploads, vec![("photo.png".to_string(), "inventory/items".to_string())]);
}

#[tokio::test]
async fn media_upload_needs_a_file_and_an_item() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let item = app.create_item("Poster", dec!(5)).await;

    let (status, body) = app
        .send(multipart_request(
            &format!("/api/items/{}/media", item.id),
            &token,
            "attachment",
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error: No file uploaded");

    let (status, _) = app
        .send(multipart_request(
            &format!("/api/items/{}/media", Uuid::new_v4()),
            &token,
            "file",
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.uploader.uploads.lock().unwrap().is_empty());
}
