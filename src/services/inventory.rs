//! Stock ledger.
//!
//! Every quantity mutation is a single conditional SQL statement, so two
//! requests touching the same `(item, warehouse)` record serialize on the
//! row instead of racing a read against a write:
//!
//! * increments are an upsert on the `(item_id, warehouse_id)` unique index
//!   that adds to the stored quantity
//! * decrements are `UPDATE ... SET quantity = quantity - n WHERE quantity >= n`
//!   and a zero row count means insufficient stock
//!
//! Operations that touch more than one record run inside one transaction.
//! The `*_in` style functions take any [`ConnectionTrait`] so callers such as
//! order creation can compose them into their own transaction.

use crate::{
    db::{begin, commit, ListQuery, PaginatedResponse, QueryBuilder, SortFields},
    entities::{inventory, item, warehouse},
    errors::ServiceError,
    services::find_required,
};
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, LoaderTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// How an order line without a warehouse is sourced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentPolicy {
    /// Deduct from any record holding enough stock, lowest record id first.
    #[default]
    AnyWarehouse,
    /// Every order must name its warehouse.
    ExplicitWarehouse,
}

const INVENTORY_FIELDS: SortFields<inventory::Column> = SortFields {
    search: &[],
    sort: &[
        ("quantity", inventory::Column::Quantity),
        ("created_at", inventory::Column::CreatedAt),
        ("updated_at", inventory::Column::UpdatedAt),
    ],
};

/// Optional filters for the inventory listing
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryFilter {
    /// Only records for this item
    pub item_id: Option<Uuid>,
    /// Only records held in this warehouse
    pub warehouse_id: Option<Uuid>,
}

/// An inventory record with the item and warehouse it refers to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(flatten)]
    pub record: inventory::Model,
    pub item: Option<item::Model>,
    pub warehouse: Option<warehouse::Model>,
}

/// Both sides of a completed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub source: inventory::Model,
    pub destination: inventory::Model,
}

fn require_positive(quantity: i32) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be greater than zero, got {}",
            quantity
        )));
    }
    Ok(())
}

async fn find_record<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Option<inventory::Model>, ServiceError> {
    Ok(inventory::Entity::find()
        .filter(inventory::Column::ItemId.eq(item_id))
        .filter(inventory::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await?)
}

async fn reload<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<inventory::Model, ServiceError> {
    find_record(conn, item_id, warehouse_id).await?.ok_or_else(|| {
        ServiceError::InternalError(format!(
            "inventory record for item {} in warehouse {} vanished",
            item_id, warehouse_id
        ))
    })
}

/// Upsert on `(item_id, warehouse_id)`. `on_existing` is the new quantity
/// expression for a record that already exists; `initial` seeds a new one.
async fn upsert_quantity<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
    initial: i32,
    on_existing: sea_orm::sea_query::SimpleExpr,
) -> Result<inventory::Model, ServiceError> {
    let now = Utc::now();
    let row = inventory::ActiveModel {
        id: sea_orm::Set(Uuid::new_v4()),
        item_id: sea_orm::Set(item_id),
        warehouse_id: sea_orm::Set(warehouse_id),
        quantity: sea_orm::Set(initial),
        created_at: sea_orm::Set(now),
        updated_at: sea_orm::Set(now),
    };

    inventory::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([inventory::Column::ItemId, inventory::Column::WarehouseId])
                .value(inventory::Column::Quantity, on_existing)
                .value(inventory::Column::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    reload(conn, item_id, warehouse_id).await
}

/// Adds `quantity` to the `(item, warehouse)` record, creating it at
/// `quantity` when absent. Callers validate the item and warehouse.
pub async fn increment_in<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> Result<inventory::Model, ServiceError> {
    require_positive(quantity)?;
    let added = Expr::col((inventory::Entity, inventory::Column::Quantity)).add(quantity);
    upsert_quantity(conn, item_id, warehouse_id, quantity, added).await
}

/// Subtracts `quantity` from one record if it holds at least that much.
/// Returns `false` when the guard rejected the update.
pub async fn decrement_record_in<C: ConnectionTrait>(
    conn: &C,
    record_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = inventory::Entity::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).sub(quantity),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory::Column::Id.eq(record_id))
        .filter(inventory::Column::Quantity.gte(quantity))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

fn insufficient(record: &inventory::Model, requested: i32) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "requested {}, available {} for item {} in warehouse {}",
        requested, record.quantity, record.item_id, record.warehouse_id
    ))
}

/// Deducts from the exact `(item, warehouse)` record.
pub async fn deduct_from_warehouse_in<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> Result<inventory::Model, ServiceError> {
    require_positive(quantity)?;
    let record = find_record(conn, item_id, warehouse_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "no inventory for item {} in warehouse {}",
                item_id, warehouse_id
            ))
        })?;

    if !decrement_record_in(conn, record.id, quantity).await? {
        let current = reload(conn, item_id, warehouse_id).await?;
        return Err(insufficient(&current, quantity));
    }
    reload(conn, item_id, warehouse_id).await
}

/// Deducts from the first record, by ascending id, that holds enough stock.
pub async fn deduct_from_any_in<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    quantity: i32,
) -> Result<inventory::Model, ServiceError> {
    require_positive(quantity)?;
    let candidates = inventory::Entity::find()
        .filter(inventory::Column::ItemId.eq(item_id))
        .filter(inventory::Column::Quantity.gte(quantity))
        .order_by_asc(inventory::Column::Id)
        .all(conn)
        .await?;

    for candidate in candidates {
        if decrement_record_in(conn, candidate.id, quantity).await? {
            debug!(record_id = %candidate.id, warehouse_id = %candidate.warehouse_id, "sourced order line");
            return reload(conn, item_id, candidate.warehouse_id).await;
        }
    }

    Err(ServiceError::InsufficientStock(format!(
        "requested {} of item {}, no warehouse holds that much",
        quantity, item_id
    )))
}

/// Service owning all stock mutations
#[derive(Clone)]
pub struct InventoryLedger {
    db: Arc<DatabaseConnection>,
    policy: FulfillmentPolicy,
}

impl InventoryLedger {
    pub fn new(db: Arc<DatabaseConnection>, policy: FulfillmentPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> FulfillmentPolicy {
        self.policy
    }

    /// Adds stock to one warehouse, creating the record on first use.
    #[instrument(skip(self))]
    pub async fn add_stock(
        &self,
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<inventory::Model, ServiceError> {
        require_positive(quantity)?;
        let txn = begin(&self.db).await?;
        find_required::<item::Entity, _>(&txn, item_id, "Item").await?;
        find_required::<warehouse::Entity, _>(&txn, warehouse_id, "Warehouse").await?;

        let record = increment_in(&txn, item_id, warehouse_id, quantity).await?;
        commit(txn).await?;

        info!(
            item_id = %item_id,
            warehouse_id = %warehouse_id,
            added = quantity,
            quantity = record.quantity,
            "stock added"
        );
        Ok(record)
    }

    /// Moves stock between two warehouses. Both sides commit together.
    #[instrument(skip(self))]
    pub async fn transfer_stock(
        &self,
        item_id: Uuid,
        from_warehouse_id: Uuid,
        to_warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<TransferOutcome, ServiceError> {
        require_positive(quantity)?;
        if from_warehouse_id == to_warehouse_id {
            return Err(ServiceError::ValidationError(
                "source and destination warehouse must differ".into(),
            ));
        }

        let txn = begin(&self.db).await?;
        find_required::<warehouse::Entity, _>(&txn, to_warehouse_id, "Warehouse").await?;

        let source = deduct_from_warehouse_in(&txn, item_id, from_warehouse_id, quantity).await?;
        let destination = increment_in(&txn, item_id, to_warehouse_id, quantity).await?;
        commit(txn).await?;

        info!(
            item_id = %item_id,
            from = %from_warehouse_id,
            to = %to_warehouse_id,
            quantity,
            "stock transferred"
        );
        Ok(TransferOutcome {
            source,
            destination,
        })
    }

    /// Deducts stock for one order line on the caller's connection.
    ///
    /// With a warehouse the exact record is used. Without one the configured
    /// [`FulfillmentPolicy`] decides.
    pub async fn deduct_for_fulfillment<C: ConnectionTrait>(
        &self,
        conn: &C,
        item_id: Uuid,
        quantity: i32,
        warehouse_id: Option<Uuid>,
    ) -> Result<inventory::Model, ServiceError> {
        match (warehouse_id, self.policy) {
            (Some(warehouse_id), _) => {
                deduct_from_warehouse_in(conn, item_id, warehouse_id, quantity).await
            }
            (None, FulfillmentPolicy::AnyWarehouse) => {
                deduct_from_any_in(conn, item_id, quantity).await
            }
            (None, FulfillmentPolicy::ExplicitWarehouse) => Err(ServiceError::ValidationError(
                "warehouse_id is required".into(),
            )),
        }
    }

    /// Books every purchase order line into `warehouse_id` on the caller's
    /// connection. The caller guards the status transition.
    pub async fn receive_purchase_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        warehouse_id: Uuid,
        lines: &[(Uuid, i32)],
    ) -> Result<Vec<inventory::Model>, ServiceError> {
        let mut records = Vec::with_capacity(lines.len());
        for (item_id, quantity) in lines {
            records.push(increment_in(conn, *item_id, warehouse_id, *quantity).await?);
        }
        Ok(records)
    }

    /// Overwrites the quantity of an `(item, warehouse)` record.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<inventory::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".into(),
            ));
        }
        let txn = begin(&self.db).await?;
        find_required::<item::Entity, _>(&txn, item_id, "Item").await?;
        find_required::<warehouse::Entity, _>(&txn, warehouse_id, "Warehouse").await?;

        let record =
            upsert_quantity(&txn, item_id, warehouse_id, quantity, Expr::value(quantity)).await?;
        commit(txn).await?;

        warn!(item_id = %item_id, warehouse_id = %warehouse_id, quantity, "stock overwritten");
        Ok(record)
    }

    /// Overwrites the quantity of an existing record by id.
    #[instrument(skip(self))]
    pub async fn set_record_quantity(
        &self,
        record_id: Uuid,
        quantity: i32,
    ) -> Result<inventory::Model, ServiceError> {
        let record = self.get(record_id).await?;
        self.set_quantity(record.item_id, record.warehouse_id, quantity)
            .await
    }

    pub async fn get(&self, record_id: Uuid) -> Result<inventory::Model, ServiceError> {
        find_required::<inventory::Entity, _>(&*self.db, record_id, "Inventory record").await
    }

    pub async fn quantity_of(
        &self,
        item_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<i32>, ServiceError> {
        Ok(find_record(&*self.db, item_id, warehouse_id)
            .await?
            .map(|r| r.quantity))
    }

    pub async fn list(
        &self,
        filter: InventoryFilter,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<InventoryEntry>, ServiceError> {
        let mut condition = Condition::all();
        if let Some(item_id) = filter.item_id {
            condition = condition.add(inventory::Column::ItemId.eq(item_id));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            condition = condition.add(inventory::Column::WarehouseId.eq(warehouse_id));
        }

        let page = QueryBuilder::<inventory::Entity>::new()
            .filter(condition)
            .shape(params, &INVENTORY_FIELDS)
            .default_order(inventory::Column::CreatedAt)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?;

        let items = page.items.load_one(item::Entity, &*self.db).await?;
        let warehouses = page.items.load_one(warehouse::Entity, &*self.db).await?;
        let mut related = items.into_iter().zip(warehouses);
        Ok(page.map(|record| {
            let (item, warehouse) = related.next().unwrap_or_default();
            InventoryEntry {
                record,
                item,
                warehouse,
            }
        }))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, record_id: Uuid) -> Result<(), ServiceError> {
        let result = inventory::Entity::delete_by_id(record_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Inventory record", record_id));
        }
        info!(record_id = %record_id, "inventory record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_any_warehouse() {
        assert_eq!(FulfillmentPolicy::default(), FulfillmentPolicy::AnyWarehouse);
    }

    #[test]
    fn policy_reads_snake_case() {
        let policy: FulfillmentPolicy = serde_json::from_str("\"explicit_warehouse\"").unwrap();
        assert_eq!(policy, FulfillmentPolicy::ExplicitWarehouse);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert!(require_positive(1).is_ok());
        assert!(matches!(require_positive(0), Err(ServiceError::ValidationError(_))));
        assert!(matches!(require_positive(-4), Err(ServiceError::ValidationError(_))));
    }
}
