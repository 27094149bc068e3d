/*!
 * # Permissions Module
 *
 * Permissions are `(resource, action)` pairs. Routes name them in the
 * `resource:action` form, e.g. `items:write`.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";
    pub const DELETE: &'static str = "delete";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const ITEMS: &'static str = "items";
    pub const CATEGORIES: &'static str = "categories";
    pub const WAREHOUSES: &'static str = "warehouses";
    pub const SUPPLIERS: &'static str = "suppliers";
    pub const DISCOUNTS: &'static str = "discounts";
    pub const INVENTORY: &'static str = "inventory";
    pub const PURCHASE_ORDERS: &'static str = "purchase_orders";
    pub const ORDERS: &'static str = "orders";
    pub const REPORTS: &'static str = "reports";
    pub const ROLES: &'static str = "roles";
    pub const REVIEWS: &'static str = "reviews";
    pub const FAVORITES: &'static str = "favorites";
    pub const ALL: &'static str = "*";
}

/// Every concrete resource a route can be guarded by
pub const ALL_RESOURCES: [&str; 12] = [
    Resources::ITEMS,
    Resources::CATEGORIES,
    Resources::WAREHOUSES,
    Resources::SUPPLIERS,
    Resources::DISCOUNTS,
    Resources::INVENTORY,
    Resources::PURCHASE_ORDERS,
    Resources::ORDERS,
    Resources::REPORTS,
    Resources::ROLES,
    Resources::REVIEWS,
    Resources::FAVORITES,
];

/// Common permission string constants for compile-time safety
pub mod consts {
    pub const ITEMS_READ: &str = "items:read";
    pub const ITEMS_WRITE: &str = "items:write";
    pub const ITEMS_DELETE: &str = "items:delete";

    pub const CATEGORIES_READ: &str = "categories:read";
    pub const CATEGORIES_WRITE: &str = "categories:write";
    pub const CATEGORIES_DELETE: &str = "categories:delete";

    pub const WAREHOUSES_READ: &str = "warehouses:read";
    pub const WAREHOUSES_WRITE: &str = "warehouses:write";
    pub const WAREHOUSES_DELETE: &str = "warehouses:delete";

    pub const SUPPLIERS_READ: &str = "suppliers:read";
    pub const SUPPLIERS_WRITE: &str = "suppliers:write";
    pub const SUPPLIERS_DELETE: &str = "suppliers:delete";

    pub const DISCOUNTS_READ: &str = "discounts:read";
    pub const DISCOUNTS_WRITE: &str = "discounts:write";
    pub const DISCOUNTS_DELETE: &str = "discounts:delete";

    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_WRITE: &str = "inventory:write";
    pub const INVENTORY_DELETE: &str = "inventory:delete";

    pub const PURCHASE_ORDERS_READ: &str = "purchase_orders:read";
    pub const PURCHASE_ORDERS_WRITE: &str = "purchase_orders:write";
    pub const PURCHASE_ORDERS_DELETE: &str = "purchase_orders:delete";

    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_WRITE: &str = "orders:write";

    pub const REPORTS_READ: &str = "reports:read";

    pub const ROLES_READ: &str = "roles:read";
    pub const ROLES_WRITE: &str = "roles:write";

    pub const REVIEWS_WRITE: &str = "reviews:write";
    pub const FAVORITES_WRITE: &str = "favorites:write";
}

/// Splits `resource:action`. Returns `None` when either half is missing.
pub fn split_permission(permission: &str) -> Option<(&str, &str)> {
    let (resource, action) = permission.split_once(':')?;
    if resource.is_empty() || action.is_empty() {
        return None;
    }
    Some((resource, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_resource_and_action() {
        assert_eq!(split_permission(consts::PURCHASE_ORDERS_WRITE), Some(("purchase_orders", "write")));
        assert_eq!(split_permission("*:*"), Some(("*", "*")));
        assert_eq!(split_permission("items"), None);
        assert_eq!(split_permission("items:"), None);
    }
}
