use super::common::{no_content_response, success_response, JsonBody};
use crate::{
    db::ListQuery,
    errors::ServiceError,
    services::inventory::InventoryFilter,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddStockRequest {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    /// Units to add, must be positive
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferStockRequest {
    pub item_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    /// Units to move, must be positive
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    /// New absolute quantity, zero or more
    pub quantity: i32,
}

/// List inventory records with optional item and warehouse filters
#[utoipa::path(
    get,
    path = "/api/inventory",
    params(InventoryFilter, ListQuery),
    responses(
        (status = 200, description = "Page of inventory records with their item and warehouse"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(filter): Query<InventoryFilter>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (default_size, max_size) = state.page_limits();
    let page = state
        .services
        .ledger
        .list(filter, &params, default_size, max_size)
        .await?;
    Ok(success_response(page))
}

/// Add stock of an item to a warehouse
#[utoipa::path(
    post,
    path = "/api/inventory/add",
    request_body = AddStockRequest,
    responses(
        (status = 200, description = "Updated inventory record"),
        (status = 400, description = "Quantity must be positive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AddStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .add_stock(payload.item_id, payload.warehouse_id, payload.quantity)
        .await?;
    Ok(success_response(record))
}

/// Move stock between two warehouses
#[utoipa::path(
    post,
    path = "/api/inventory/transfer",
    request_body = TransferStockRequest,
    responses(
        (status = 200, description = "Source and destination records after the move"),
        (status = 400, description = "Insufficient stock or invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "No stock record at the source", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TransferStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state
        .services
        .ledger
        .transfer_stock(
            payload.item_id,
            payload.from_warehouse_id,
            payload.to_warehouse_id,
            payload.quantity,
        )
        .await?;
    Ok(success_response(outcome))
}

/// Overwrite the quantity of one record
#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Updated inventory record"),
        (status = 400, description = "Negative quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn set_quantity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<SetQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .ledger
        .set_record_quantity(id, payload.quantity)
        .await?;
    Ok(success_response(record))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory record id")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.ledger.delete(id).await?;
    Ok(no_content_response())
}
