//! Seed data script - populates the database with demo data
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 3 categories, 2 suppliers and 2 warehouses
//! - 6 items spread across the categories
//! - Opening stock for every item in both warehouses
//! - An admin account (`SEED_ADMIN_USERNAME` / `SEED_ADMIN_PASSWORD`)

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use stockroom_api::{
    config, db,
    entities::{category, item, supplier, warehouse},
    services::catalog::{
        CatalogService, CreateCategoryRequest, CreateItemRequest, CreateSupplierRequest,
        CreateWarehouseRequest,
    },
    AppState,
};

const ITEMS: [(&str, &str, Decimal, usize, usize); 6] = [
    ("USB-C Cable 2m", "Braided charging cable", dec!(9.99), 0, 0),
    ("Wireless Mouse", "2.4GHz, 3 buttons", dec!(24.50), 0, 0),
    ("Mechanical Keyboard", "Tenkeyless, brown switches", dec!(89.00), 0, 1),
    ("Desk Lamp", "LED, dimmable", dec!(34.90), 1, 1),
    ("Notebook A5", "Dotted, 120 pages", dec!(4.75), 2, 0),
    ("Gel Pen Pack", "10 pens, assorted", dec!(6.20), 2, 1),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Stockroom seed data ===");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to the database")?;
    db::run_migrations(&pool).await?;

    let state = AppState::with_uploader(Arc::new(pool), cfg, None);
    let catalog = &state.services.catalog;

    info!("Creating reference data...");
    let categories = create_categories(catalog).await?;
    let suppliers = create_suppliers(catalog).await?;
    let warehouses = create_warehouses(catalog).await?;

    info!("Creating items...");
    let items = create_items(catalog, &categories, &suppliers).await?;
    info!("  Created {} items", items.len());

    info!("Stocking warehouses...");
    let mut records = 0;
    for (i, item) in items.iter().enumerate() {
        for (w, warehouse) in warehouses.iter().enumerate() {
            // Keep a couple of records under the low-stock threshold
            let quantity = if (i + w) % 4 == 0 { 5 } else { 25 + (i as i32) * 10 };
            state
                .services
                .ledger
                .add_stock(item.id, warehouse.id, quantity)
                .await?;
            records += 1;
        }
    }
    info!("  Created {} inventory records", records);

    let username = std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    match std::env::var("SEED_ADMIN_PASSWORD") {
        Ok(password) => {
            state.auth.ensure_admin(&username, &password).await?;
            info!("  Admin account '{}' ready", username);
        }
        Err(_) => info!("  SEED_ADMIN_PASSWORD not set; skipping admin account"),
    }

    info!("=== Seed complete ===");
    Ok(())
}

async fn create_categories(catalog: &CatalogService) -> anyhow::Result<Vec<category::Model>> {
    let mut out = Vec::new();
    for (name, description) in [
        ("Electronics", "Cables, peripherals and gadgets"),
        ("Furniture", "Desk and office furniture"),
        ("Stationery", "Paper goods and writing supplies"),
    ] {
        out.push(
            catalog
                .create_category(CreateCategoryRequest {
                    name: name.into(),
                    description: Some(description.into()),
                })
                .await?,
        );
    }
    Ok(out)
}

async fn create_suppliers(catalog: &CatalogService) -> anyhow::Result<Vec<supplier::Model>> {
    let mut out = Vec::new();
    for (name, contact, address) in [
        ("Northwind Components", "orders@northwind.example", "12 Harbour Rd"),
        ("Paper & Co", "+1 555 0100", "88 Mill Street"),
    ] {
        out.push(
            catalog
                .create_supplier(CreateSupplierRequest {
                    name: name.into(),
                    contact_info: Some(contact.into()),
                    address: Some(address.into()),
                })
                .await?,
        );
    }
    Ok(out)
}

async fn create_warehouses(catalog: &CatalogService) -> anyhow::Result<Vec<warehouse::Model>> {
    let mut out = Vec::new();
    for (name, location, capacity) in [("Main", "Building A", 10_000), ("Overflow", "Building C", 2_500)] {
        out.push(
            catalog
                .create_warehouse(CreateWarehouseRequest {
                    name: name.into(),
                    location: Some(location.into()),
                    capacity,
                })
                .await?,
        );
    }
    Ok(out)
}

async fn create_items(
    catalog: &CatalogService,
    categories: &[category::Model],
    suppliers: &[supplier::Model],
) -> anyhow::Result<Vec<item::Model>> {
    let mut out = Vec::new();
    for (name, description, price, category_idx, supplier_idx) in ITEMS {
        out.push(
            catalog
                .create_item(CreateItemRequest {
                    name: name.into(),
                    description: Some(description.into()),
                    price,
                    category_id: categories.get(category_idx).map(|c| c.id),
                    supplier_id: suppliers.get(supplier_idx).map(|s| s.id),
                })
                .await?,
        );
    }
    Ok(out)
}
