use crate::handlers;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = r#"
# Stockroom API

Inventory and commerce backend: catalog, per-warehouse stock, sales orders,
purchase orders, reports and role-based access control.

## Authentication

Register with `POST /api/register`, then exchange credentials for a token with
`POST /api/login`. Send the token on every other `/api` request:

```
Authorization: Bearer <token>
```

A missing or invalid token is answered with 401. A valid token lacking the
route's `resource:action` permission is answered with 403.

## Errors

Every failure has the body `{"error": "<message>"}`.

## Pagination

List endpoints accept `page` (from 1), `page_size` (default 10, max 100),
`search`, `sort` and `order` (`asc` or `desc`).
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8081", description = "Local development")),
    tags(
        (name = "auth", description = "Registration, login and the current principal"),
        (name = "items", description = "Catalog items, reviews, favorites and media"),
        (name = "categories", description = "Item categories"),
        (name = "warehouses", description = "Warehouses"),
        (name = "suppliers", description = "Suppliers"),
        (name = "discounts", description = "Discounts"),
        (name = "inventory", description = "Per-warehouse stock ledger"),
        (name = "orders", description = "Sales orders"),
        (name = "purchase-orders", description = "Purchase orders and receipt"),
        (name = "reports", description = "Financial, sales and dashboard reports"),
        (name = "rbac", description = "Roles and permissions"),
        (name = "health", description = "Health probes")
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,

        handlers::items::list_items,
        handlers::items::get_item,
        handlers::items::create_item,
        handlers::items::update_item,
        handlers::items::delete_item,
        handlers::items::list_reviews,
        handlers::items::create_review,
        handlers::items::toggle_favorite,
        handlers::items::upload_media,

        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,

        handlers::warehouses::list_warehouses,
        handlers::warehouses::create_warehouse,
        handlers::warehouses::update_warehouse,
        handlers::warehouses::delete_warehouse,

        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,

        handlers::discounts::list_discounts,
        handlers::discounts::create_discount,
        handlers::discounts::update_discount,
        handlers::discounts::delete_discount,

        handlers::inventory::list_inventory,
        handlers::inventory::add_stock,
        handlers::inventory::transfer_stock,
        handlers::inventory::set_quantity,
        handlers::inventory::delete_inventory,

        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,

        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::update_status,
        handlers::purchase_orders::delete_purchase_order,

        handlers::reports::financial_report,
        handlers::reports::sales_report,
        handlers::reports::dashboard,

        handlers::rbac::create_role,
        handlers::rbac::list_roles,
        handlers::rbac::create_permission,
        handlers::rbac::list_permissions,
        handlers::rbac::assign_permissions,
        handlers::rbac::assign_role,

        handlers::health::ping,
        handlers::health::readiness,
    ),
    components(schemas(crate::errors::ErrorResponse)),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_and_public_paths() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Stockroom API"));
        assert!(json.contains("/api/inventory/transfer"));
        assert!(json.contains("/api/purchase-orders/{id}/status"));
        assert!(json.contains("bearer_auth"));
    }
}
