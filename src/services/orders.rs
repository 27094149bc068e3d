use crate::{
    db::{begin, commit, ListQuery, PaginatedResponse, QueryBuilder, SortFields},
    entities::{
        item,
        order::{self, OrderStatus},
        order_item, warehouse,
    },
    errors::ServiceError,
    services::{find_required, inventory::InventoryLedger},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const ORDER_FIELDS: SortFields<order::Column> = SortFields {
    search: &[order::Column::PaymentMethod, order::Column::Status],
    sort: &[
        ("date", order::Column::Date),
        ("total_amount", order::Column::TotalAmount),
    ],
};

/// One requested order line. `unit_price` is the price charged, not the
/// catalog price.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = String, example = "19.99")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub user_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub payment_method: String,
    pub items: Vec<OrderLine>,
}

/// An order together with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Σ quantity × unit_price, or a validation error when the sum leaves the
/// decimal range.
pub fn order_total(lines: &[OrderLine]) -> Result<Decimal, ServiceError> {
    lines.iter().enumerate().try_fold(Decimal::ZERO, |total, (index, line)| {
        line.unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "items[{}] pushes the order total out of range",
                    index
                ))
            })
    })
}

fn validate_lines(lines: &[OrderLine]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "an order needs at least one item".into(),
        ));
    }
    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "items[{}].quantity must be greater than zero",
                index
            )));
        }
        if line.unit_price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "items[{}].unit_price must not be negative",
                index
            )));
        }
    }
    Ok(())
}

/// Sales order creation and lookup
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    ledger: InventoryLedger,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, ledger: InventoryLedger) -> Self {
        Self { db, ledger }
    }

    /// Deducts stock for every line and records the order in one transaction.
    ///
    /// Any failing line aborts the whole order: no stock moves and no order
    /// row is written.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, lines = input.items.len()))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderWithItems, ServiceError> {
        validate_lines(&input.items)?;
        let payment_method = input.payment_method.trim();
        if payment_method.is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_method is required".into(),
            ));
        }
        let total = order_total(&input.items)?;

        let txn = begin(&self.db).await?;
        if let Some(warehouse_id) = input.warehouse_id {
            find_required::<warehouse::Entity, _>(&txn, warehouse_id, "Warehouse").await?;
        }

        for line in &input.items {
            find_required::<item::Entity, _>(&txn, line.item_id, "Item").await?;
            self.ledger
                .deduct_for_fulfillment(&txn, line.item_id, line.quantity, input.warehouse_id)
                .await?;
        }

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(input.user_id),
            warehouse_id: Set(input.warehouse_id),
            total_amount: Set(total),
            status: Set(OrderStatus::Completed),
            payment_method: Set(payment_method.to_string()),
            date: Set(now),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for (line_no, line) in input.items.iter().enumerate() {
            let row = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                item_id: Set(line.item_id),
                line_no: Set(line_no as i32 + 1),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
            }
            .insert(&txn)
            .await?;
            items.push(row);
        }

        commit(txn).await?;
        info!(order_id = %order.id, total = %order.total_amount, "order created");
        Ok(OrderWithItems { order, items })
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = find_required::<order::Entity, _>(&*self.db, id, "Order").await?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(id))
            .order_by_asc(order_item::Column::LineNo)
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list_orders(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        Ok(QueryBuilder::<order::Entity>::new()
            .shape(params, &ORDER_FIELDS)
            .default_order(order::Column::Date)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal) -> OrderLine {
        OrderLine {
            item_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn total_uses_request_prices() {
        let lines = vec![line(2, dec!(10.50)), line(3, dec!(1.25))];
        assert_eq!(order_total(&lines).unwrap(), dec!(24.75));
    }

    #[test]
    fn total_overflow_is_a_validation_error() {
        let err = order_total(&[line(1, dec!(1)), line(100, Decimal::MAX)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: items[1] pushes the order total out of range"
        );

        let err = order_total(&[line(1, Decimal::MAX), line(1, Decimal::MAX)]).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn empty_order_is_rejected() {
        assert!(matches!(validate_lines(&[]), Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let err = validate_lines(&[line(1, dec!(1)), line(0, dec!(1))]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: items[1].quantity must be greater than zero"
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(validate_lines(&[line(1, dec!(-0.01))]).is_err());
    }
}
