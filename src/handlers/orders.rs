use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::AuthUser,
    db::ListQuery,
    errors::ServiceError,
    services::orders::{CreateOrderInput, OrderLine},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Source warehouse; when absent the fulfillment policy decides
    pub warehouse_id: Option<Uuid>,
    pub payment_method: String,
    pub items: Vec<OrderLine>,
}

/// Record a sale and deduct its stock
///
/// All lines are deducted in one transaction. If any line cannot be
/// fulfilled nothing is deducted and no order is stored.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created with its lines"),
        (status = 400, description = "Invalid lines or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock record or warehouse not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: user.user_id,
            warehouse_id: payload.warehouse_id,
            payment_method: payload.payment_method,
            items: payload.items,
        })
        .await?;

    info!(order_id = %order.order.id, user_id = %user.user_id, "order placed");
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of orders"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (default_size, max_size) = state.page_limits();
    let page = state
        .services
        .orders
        .list_orders(&params, default_size, max_size)
        .await?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(success_response(order))
}
