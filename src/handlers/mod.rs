pub mod auth;
pub mod categories;
pub mod common;
pub mod discounts;
pub mod health;
pub mod inventory;
pub mod items;
pub mod orders;
pub mod purchase_orders;
pub mod rbac;
pub mod reports;
pub mod suppliers;
pub mod warehouses;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        catalog::CatalogService,
        favorites::FavoriteService,
        inventory::InventoryLedger,
        media::{BlobUploader, MediaService},
        orders::OrderService,
        purchase_orders::PurchaseOrderService,
        rbac::RbacService,
        reports::ReportService,
        reviews::ReviewService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub favorites: Arc<FavoriteService>,
    pub reviews: Arc<ReviewService>,
    pub media: Arc<MediaService>,
    pub reports: Arc<ReportService>,
    pub rbac: Arc<RbacService>,
}

impl AppServices {
    /// Wires every service onto the shared pool. Orders and purchase orders
    /// share one ledger so both follow the configured fulfillment policy.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        uploader: Option<Arc<dyn BlobUploader>>,
    ) -> Self {
        let ledger = InventoryLedger::new(db_pool.clone(), config.fulfillment_policy);

        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            orders: Arc::new(OrderService::new(db_pool.clone(), ledger.clone())),
            purchase_orders: Arc::new(PurchaseOrderService::new(db_pool.clone(), ledger.clone())),
            ledger: Arc::new(ledger),
            favorites: Arc::new(FavoriteService::new(db_pool.clone())),
            reviews: Arc::new(ReviewService::new(db_pool.clone())),
            media: Arc::new(MediaService::new(
                db_pool.clone(),
                uploader,
                config.media_folder.clone(),
            )),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            rbac: Arc::new(RbacService::new(db_pool)),
        }
    }
}
