#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use stockroom_api::{
    app,
    config::AppConfig,
    db,
    entities::{item, permission, role, role_permission, supplier, warehouse},
    errors::ServiceError,
    services::{
        catalog::{CreateItemRequest, CreateSupplierRequest, CreateWarehouseRequest},
        media::{BlobFile, BlobUploader, StoredBlob},
    },
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Records every upload and answers with a predictable CDN URL.
#[derive(Default)]
pub struct StubUploader {
    pub uploads: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl BlobUploader for StubUploader {
    async fn upload(&self, file: BlobFile, folder: &str) -> Result<StoredBlob, ServiceError> {
        let mut uploads = self.uploads.lock().expect("uploads lock");
        uploads.push((file.file_name.clone(), folder.to_string()));
        Ok(StoredBlob {
            url: format!("https://cdn.test/{}/{}", folder, file.file_name),
            public_id: format!("{}/{}", folder, uploads.len()),
        })
    }
}

/// Helper harness for spinning up the full router on an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub uploader: Arc<StubUploader>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh database per call; `tweak` runs before the state is built.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        // Every pooled connection to sqlite::memory: is its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_acquire_timeout_secs = 30;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let uploader = Arc::new(StubUploader::default());
        let state = AppState::with_uploader(
            Arc::new(pool),
            cfg,
            Some(uploader.clone() as Arc<dyn BlobUploader>),
        );

        Self {
            router: app(state.clone()),
            state,
            uploader,
        }
    }

    /// Sends a request through the router and decodes the JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a user through the service layer and returns its id and token.
    pub async fn register(&self, username: &str) -> (Uuid, String) {
        let user = self
            .state
            .auth
            .register(username, TEST_PASSWORD)
            .await
            .expect("register user");
        let token = self.state.auth.issue_token(user.id).expect("issue token").token;
        (user.id, token)
    }

    pub async fn admin_token(&self) -> String {
        self.token_for_role("admin-user", stockroom_api::auth::ADMIN_ROLE)
            .await
    }

    pub async fn staff_token(&self) -> String {
        self.token_for_role("staff-user", stockroom_api::auth::STAFF_ROLE)
            .await
    }

    pub async fn token_for_role(&self, username: &str, role_name: &str) -> String {
        let role = role::Entity::find()
            .filter(role::Column::Name.eq(role_name))
            .one(&*self.state.db)
            .await
            .expect("role lookup")
            .expect("seeded role");
        let (user_id, token) = self.register(username).await;
        self.state
            .services
            .rbac
            .assign_role(user_id, role.id)
            .await
            .expect("assign role");
        token
    }

    /// A user whose role grants exactly `grants` (`resource:action` strings).
    pub async fn token_with_permissions(&self, username: &str, grants: &[&str]) -> String {
        let db = &*self.state.db;
        let role = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("{}-role", username)),
            description: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await
        .expect("insert role");

        for grant in grants {
            let (resource, action) = grant.split_once(':').expect("resource:action");
            let existing = permission::Entity::find()
                .filter(permission::Column::Resource.eq(resource))
                .filter(permission::Column::Action.eq(action))
                .one(db)
                .await
                .expect("permission lookup");
            let permission = match existing {
                Some(p) => p,
                None => permission::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    resource: Set(resource.to_string()),
                    action: Set(action.to_string()),
                    created_at: Set(chrono::Utc::now()),
                }
                .insert(db)
                .await
                .expect("insert permission"),
            };
            role_permission::ActiveModel {
                role_id: Set(role.id),
                permission_id: Set(permission.id),
            }
            .insert(db)
            .await
            .expect("grant permission");
        }

        let (user_id, token) = self.register(username).await;
        self.state
            .services
            .rbac
            .assign_role(user_id, role.id)
            .await
            .expect("assign role");
        token
    }

    pub async fn create_item(&self, name: &str, price: Decimal) -> item::Model {
        self.state
            .services
            .catalog
            .create_item(CreateItemRequest {
                name: name.to_string(),
                description: None,
                price,
                category_id: None,
                supplier_id: None,
            })
            .await
            .expect("create item")
    }

    pub async fn create_warehouse(&self, name: &str) -> warehouse::Model {
        self.state
            .services
            .catalog
            .create_warehouse(CreateWarehouseRequest {
                name: name.to_string(),
                location: None,
                capacity: 1_000,
            })
            .await
            .expect("create warehouse")
    }

    pub async fn create_supplier(&self, name: &str) -> supplier::Model {
        self.state
            .services
            .catalog
            .create_supplier(CreateSupplierRequest {
                name: name.to_string(),
                contact_info: None,
                address: None,
            })
            .await
            .expect("create supplier")
    }

    pub async fn stock(&self, item_id: Uuid, warehouse_id: Uuid, quantity: i32) {
        self.state
            .services
            .ledger
            .add_stock(item_id, warehouse_id, quantity)
            .await
            .expect("add stock");
    }

    /// `None` when no record exists for the pair
    pub async fn quantity(&self, item_id: Uuid, warehouse_id: Uuid) -> Option<i32> {
        self.state
            .services
            .ledger
            .quantity_of(item_id, warehouse_id)
            .await
            .expect("quantity lookup")
    }
}
