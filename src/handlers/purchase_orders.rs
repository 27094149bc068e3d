use super::common::{created_response, no_content_response, success_response, JsonBody};
use crate::{
    db::ListQuery,
    errors::ServiceError,
    services::{
        orders::OrderLine,
        purchase_orders::{parse_status, CreatePurchaseOrderInput},
    },
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
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    /// Warehouse the goods are received into
    pub warehouse_id: Uuid,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// `Pending`, `Received` or `Cancelled`
    #[schema(example = "Received")]
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/api/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created as Pending"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier, warehouse or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state
        .services
        .purchase_orders
        .create(CreatePurchaseOrderInput {
            supplier_id: payload.supplier_id,
            warehouse_id: payload.warehouse_id,
            items: payload.items,
        })
        .await?;
    Ok(created_response(po))
}

#[utoipa::path(
    get,
    path = "/api/purchase-orders",
    params(ListQuery),
    responses((status = 200, description = "Page of purchase orders with their lines")),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (default_size, max_size) = state.page_limits();
    let page = state
        .services
        .purchase_orders
        .list(&params, default_size, max_size)
        .await?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order with its lines"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let po = state.services.purchase_orders.get(id).await?;
    Ok(success_response(po))
}

/// Move a purchase order through its lifecycle
///
/// `Received` books every line into the purchase order's warehouse. A
/// purchase order can be received once.
#[utoipa::path(
    put,
    path = "/api/purchase-orders/{id}/status",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Purchase order after the transition"),
        (status = 400, description = "Unknown status or transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let next = parse_status(&payload.status)?;
    let po = state
        .services
        .purchase_orders
        .update_status(id, next)
        .await?;
    Ok(success_response(po))
}

#[utoipa::path(
    delete,
    path = "/api/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order id")),
    responses(
        (status = 204, description = "Purchase order deleted; stock is not touched"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.purchase_orders.delete(id).await?;
    Ok(no_content_response())
}
