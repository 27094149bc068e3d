//! Purchase order lifecycle.
//!
//! Creating a purchase order never touches stock. The single transition
//! that does is `Pending -> Received`, which books every line into the
//! order's warehouse in the same transaction as the status write. The
//! status row is re-read under that transaction and updated with a guard
//! on the old status, so a second receipt can never apply.

use crate::{
    db::{begin, commit, ListQuery, PaginatedResponse, QueryBuilder, SortFields},
    entities::{
        item,
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_item, supplier, warehouse,
    },
    errors::ServiceError,
    services::{find_required, inventory::InventoryLedger, orders::OrderLine},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const PURCHASE_ORDER_FIELDS: SortFields<purchase_order::Column> = SortFields {
    search: &[purchase_order::Column::Status],
    sort: &[
        ("date", purchase_order::Column::Date),
        ("total_amount", purchase_order::Column::TotalAmount),
    ],
};

#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderWithItems {
    #[serde(flatten)]
    pub purchase_order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

/// Parses a wire status name such as `Received`.
pub fn parse_status(raw: &str) -> Result<PurchaseOrderStatus, ServiceError> {
    PurchaseOrderStatus::from_str(raw.trim()).map_err(|_| {
        ServiceError::ValidationError(format!(
            "unknown purchase order status '{}'; expected Pending, Received or Cancelled",
            raw
        ))
    })
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    ledger: InventoryLedger,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>, ledger: InventoryLedger) -> Self {
        Self { db, ledger }
    }

    /// Records a `Pending` purchase order. No stock moves.
    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, lines = input.items.len()))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrderWithItems, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a purchase order needs at least one item".into(),
            ));
        }
        if let Some((index, _)) = input
            .items
            .iter()
            .enumerate()
            .find(|(_, l)| l.quantity <= 0 || l.unit_price.is_sign_negative())
        {
            return Err(ServiceError::ValidationError(format!(
                "items[{}] needs a positive quantity and a non-negative unit_price",
                index
            )));
        }
        let total = super::orders::order_total(&input.items)?;

        let txn = begin(&self.db).await?;
        find_required::<supplier::Entity, _>(&txn, input.supplier_id, "Supplier").await?;
        find_required::<warehouse::Entity, _>(&txn, input.warehouse_id, "Warehouse").await?;
        for line in &input.items {
            find_required::<item::Entity, _>(&txn, line.item_id, "Item").await?;
        }

        let now = Utc::now();
        let purchase_order = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_id: Set(input.supplier_id),
            warehouse_id: Set(input.warehouse_id),
            status: Set(PurchaseOrderStatus::Pending),
            total_amount: Set(total),
            date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for (line_no, line) in input.items.iter().enumerate() {
            items.push(
                purchase_order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    purchase_order_id: Set(purchase_order.id),
                    item_id: Set(line.item_id),
                    line_no: Set(line_no as i32 + 1),
                    quantity: Set(line.quantity),
                    unit_price: Set(line.unit_price),
                }
                .insert(&txn)
                .await?,
            );
        }

        commit(txn).await?;
        info!(purchase_order_id = %purchase_order.id, "purchase order created");
        Ok(PurchaseOrderWithItems {
            purchase_order,
            items,
        })
    }

    /// Applies a status transition; `Received` books the stock.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        next: PurchaseOrderStatus,
    ) -> Result<purchase_order::Model, ServiceError> {
        let txn = begin(&self.db).await?;
        let current = find_required::<purchase_order::Entity, _>(&txn, id, "Purchase order").await?;

        if !current.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStateTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }
        if current.status == next {
            return Ok(current);
        }

        // Guarded on the status we read; a concurrent transition leaves zero rows.
        let updated = purchase_order::Entity::update_many()
            .col_expr(purchase_order::Column::Status, Expr::value(next.to_string()))
            .col_expr(purchase_order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(purchase_order::Column::Id.eq(id))
            .filter(purchase_order::Column::Status.eq(current.status))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            let latest = find_required::<purchase_order::Entity, _>(&txn, id, "Purchase order").await?;
            return Err(ServiceError::InvalidStateTransition {
                from: latest.status.to_string(),
                to: next.to_string(),
            });
        }

        if next == PurchaseOrderStatus::Received {
            let lines: Vec<(Uuid, i32)> = purchase_order_item::Entity::find()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
                .order_by_asc(purchase_order_item::Column::LineNo)
                .all(&txn)
                .await?
                .into_iter()
                .map(|line| (line.item_id, line.quantity))
                .collect();
            self.ledger
                .receive_purchase_order(&txn, current.warehouse_id, &lines)
                .await?;
            info!(purchase_order_id = %id, lines = lines.len(), "purchase order received into stock");
        }

        let updated = find_required::<purchase_order::Entity, _>(&txn, id, "Purchase order").await?;
        commit(txn).await?;
        info!(purchase_order_id = %id, from = %current.status, to = %next, "purchase order status changed");
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<PurchaseOrderWithItems, ServiceError> {
        let purchase_order =
            find_required::<purchase_order::Entity, _>(&*self.db, id, "Purchase order").await?;
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .order_by_asc(purchase_order_item::Column::LineNo)
            .all(&*self.db)
            .await?;
        Ok(PurchaseOrderWithItems {
            purchase_order,
            items,
        })
    }

    pub async fn list(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<PurchaseOrderWithItems>, ServiceError> {
        let page = QueryBuilder::<purchase_order::Entity>::new()
            .shape(params, &PURCHASE_ORDER_FIELDS)
            .default_order(purchase_order::Column::Date)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?;

        let lines = page
            .items
            .load_many(
                purchase_order_item::Entity::find().order_by_asc(purchase_order_item::Column::LineNo),
                &*self.db,
            )
            .await?;
        let mut lines = lines.into_iter();
        Ok(page.map(|purchase_order| PurchaseOrderWithItems {
            purchase_order,
            items: lines.next().unwrap_or_default(),
        }))
    }

    /// Deletes the record and its lines. Stock already received stays put.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = purchase_order::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Purchase order", id));
        }
        info!(purchase_order_id = %id, "purchase order deleted");
        Ok(())
    }
}
