//! Stockroom API Library
//!
//! Inventory and commerce backend: a per-warehouse stock ledger, sales and
//! purchase orders that move stock atomically, and role-based access control
//! over every `/api` route.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::media::{BlobUploader, CloudinaryUploader};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds state from configuration. Media uploads go to Cloudinary when
    /// `cloudinary_url` is set and are refused otherwise.
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig) -> Result<Self, ServiceError> {
        let uploader: Option<Arc<dyn BlobUploader>> = match config.cloudinary_url.as_deref() {
            Some(url) => Some(Arc::new(CloudinaryUploader::from_url(url)?)),
            None => {
                warn!("cloudinary_url not configured; media uploads are disabled");
                None
            }
        };
        Ok(Self::with_uploader(db, config, uploader))
    }

    pub fn with_uploader(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        uploader: Option<Arc<dyn BlobUploader>>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config), db.clone()));
        let services = handlers::AppServices::new(db.clone(), &config, uploader);
        Self {
            db,
            config,
            auth,
            services,
        }
    }

    /// `(default, max)` page sizes for list endpoints
    pub fn page_limits(&self) -> (u64, u64) {
        (self.config.default_page_size, self.config.max_page_size)
    }
}

/// Builds the complete HTTP application: public routes, the guarded `/api`
/// tree, Swagger UI and the global middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::readiness))
        .route("/api/register", post(handlers::auth::register))
        .route("/api/login", post(handlers::auth::login))
        .merge(api_routes())
        .merge(openapi::swagger_ui())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(state.auth.clone()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Every authenticated route, grouped by the permission it requires.
pub fn api_routes() -> Router<AppState> {
    use handlers::{
        auth, categories, discounts, inventory, items, orders, purchase_orders, rbac, reports,
        suppliers, warehouses,
    };

    let me = Router::new().route("/api/me", get(auth::me)).with_auth();

    // Items, their reviews, favorites and media
    let items_read = Router::new()
        .route("/api/items", get(items::list_items))
        .route("/api/items/:id", get(items::get_item))
        .route("/api/items/:id/reviews", get(items::list_reviews))
        .with_permission(perm::ITEMS_READ);

    let items_write = Router::new()
        .route("/api/items", post(items::create_item))
        .route("/api/items/:id", put(items::update_item))
        .route("/api/items/:id/media", post(items::upload_media))
        .with_permission(perm::ITEMS_WRITE);

    let items_delete = Router::new()
        .route("/api/items/:id", delete(items::delete_item))
        .with_permission(perm::ITEMS_DELETE);

    let reviews_write = Router::new()
        .route("/api/items/:id/reviews", post(items::create_review))
        .with_permission(perm::REVIEWS_WRITE);

    let favorites_write = Router::new()
        .route("/api/items/:id/favorite", post(items::toggle_favorite))
        .with_permission(perm::FAVORITES_WRITE);

    // Catalog reference data
    let category_routes = Router::new()
        .merge(
            Router::new()
                .route("/api/categories", get(categories::list_categories))
                .with_permission(perm::CATEGORIES_READ),
        )
        .merge(
            Router::new()
                .route("/api/categories", post(categories::create_category))
                .route("/api/categories/:id", put(categories::update_category))
                .with_permission(perm::CATEGORIES_WRITE),
        )
        .merge(
            Router::new()
                .route("/api/categories/:id", delete(categories::delete_category))
                .with_permission(perm::CATEGORIES_DELETE),
        );

    let warehouse_routes = Router::new()
        .merge(
            Router::new()
                .route("/api/warehouses", get(warehouses::list_warehouses))
                .with_permission(perm::WAREHOUSES_READ),
        )
        .merge(
            Router::new()
                .route("/api/warehouses", post(warehouses::create_warehouse))
                .route("/api/warehouses/:id", put(warehouses::update_warehouse))
                .with_permission(perm::WAREHOUSES_WRITE),
        )
        .merge(
            Router::new()
                .route("/api/warehouses/:id", delete(warehouses::delete_warehouse))
                .with_permission(perm::WAREHOUSES_DELETE),
        );

    let supplier_routes = Router::new()
        .merge(
            Router::new()
                .route("/api/suppliers", get(suppliers::list_suppliers))
                .with_permission(perm::SUPPLIERS_READ),
        )
        .merge(
            Router::new()
                .route("/api/suppliers", post(suppliers::create_supplier))
                .route("/api/suppliers/:id", put(suppliers::update_supplier))
                .with_permission(perm::SUPPLIERS_WRITE),
        )
        .merge(
            Router::new()
                .route("/api/suppliers/:id", delete(suppliers::delete_supplier))
                .with_permission(perm::SUPPLIERS_DELETE),
        );

    let discount_routes = Router::new()
        .merge(
            Router::new()
                .route("/api/discounts", get(discounts::list_discounts))
                .with_permission(perm::DISCOUNTS_READ),
        )
        .merge(
            Router::new()
                .route("/api/discounts", post(discounts::create_discount))
                .route("/api/discounts/:id", put(discounts::update_discount))
                .with_permission(perm::DISCOUNTS_WRITE),
        )
        .merge(
            Router::new()
                .route("/api/discounts/:id", delete(discounts::delete_discount))
                .with_permission(perm::DISCOUNTS_DELETE),
        );

    // Inventory routes with permission gating
    let inventory_read = Router::new()
        .route("/api/inventory", get(inventory::list_inventory))
        .with_permission(perm::INVENTORY_READ);

    let inventory_mutate = Router::new()
        .route("/api/inventory/add", post(inventory::add_stock))
        .route("/api/inventory/transfer", post(inventory::transfer_stock))
        .route("/api/inventory/:id", put(inventory::set_quantity))
        .with_permission(perm::INVENTORY_WRITE);

    let inventory_delete = Router::new()
        .route("/api/inventory/:id", delete(inventory::delete_inventory))
        .with_permission(perm::INVENTORY_DELETE);

    // Purchase orders
    let purchase_orders_read = Router::new()
        .route(
            "/api/purchase-orders",
            get(purchase_orders::list_purchase_orders),
        )
        .route(
            "/api/purchase-orders/:id",
            get(purchase_orders::get_purchase_order),
        )
        .with_permission(perm::PURCHASE_ORDERS_READ);

    let purchase_orders_write = Router::new()
        .route(
            "/api/purchase-orders",
            post(purchase_orders::create_purchase_order),
        )
        .route(
            "/api/purchase-orders/:id/status",
            put(purchase_orders::update_status),
        )
        .with_permission(perm::PURCHASE_ORDERS_WRITE);

    let purchase_orders_delete = Router::new()
        .route(
            "/api/purchase-orders/:id",
            delete(purchase_orders::delete_purchase_order),
        )
        .with_permission(perm::PURCHASE_ORDERS_DELETE);

    // Orders routes with permission gating
    let orders_read = Router::new()
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders/:id", get(orders::get_order))
        .with_permission(perm::ORDERS_READ);

    let orders_create = Router::new()
        .route("/api/orders", post(orders::create_order))
        .with_permission(perm::ORDERS_WRITE);

    let report_routes = Router::new()
        .route("/api/reports/financial", get(reports::financial_report))
        .route("/api/reports/sales", get(reports::sales_report))
        .route("/api/reports/dashboard", get(reports::dashboard))
        .with_permission(perm::REPORTS_READ);

    let rbac_read = Router::new()
        .route("/api/rbac/roles", get(rbac::list_roles))
        .route("/api/rbac/permissions", get(rbac::list_permissions))
        .with_permission(perm::ROLES_READ);

    let rbac_write = Router::new()
        .route("/api/rbac/roles", post(rbac::create_role))
        .route("/api/rbac/permissions", post(rbac::create_permission))
        .route(
            "/api/rbac/roles/:id/permissions",
            post(rbac::assign_permissions),
        )
        .route("/api/rbac/users/:id/role", post(rbac::assign_role))
        .with_permission(perm::ROLES_WRITE);

    Router::new()
        .merge(me)
        .merge(items_read)
        .merge(items_write)
        .merge(items_delete)
        .merge(reviews_write)
        .merge(favorites_write)
        .merge(category_routes)
        .merge(warehouse_routes)
        .merge(supplier_routes)
        .merge(discount_routes)
        .merge(inventory_read)
        .merge(inventory_mutate)
        .merge(inventory_delete)
        .merge(purchase_orders_read)
        .merge(purchase_orders_write)
        .merge(purchase_orders_delete)
        .merge(orders_read)
        .merge(orders_create)
        .merge(report_routes)
        .merge(rbac_read)
        .merge(rbac_write)
}

/// Explicit origins when configured, permissive in development, same-origin
/// otherwise.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        info!("Using permissive CORS in the development environment");
        CorsLayer::permissive()
    } else {
        warn!("No CORS origins configured; cross-origin requests will be rejected");
        CorsLayer::new()
    }
}
