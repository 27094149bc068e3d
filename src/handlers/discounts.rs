use super::common::{created_response, no_content_response, success_response, JsonBody};
use crate::{
    db::ListQuery,
    errors::ServiceError,
    services::catalog::{CreateDiscountRequest, UpdateDiscountRequest},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

/// List discounts
#[utoipa::path(
    get,
    path = "/api/discounts",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of discounts"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "discounts"
)]
pub async fn list_discounts(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (default_size, max_size) = state.page_limits();
    let page = state
        .services
        .catalog
        .list_discounts(&params, default_size, max_size)
        .await?;
    Ok(success_response(page))
}

#[utoipa::path(
    post,
    path = "/api/discounts",
    request_body = CreateDiscountRequest,
    responses(
        (status = 201, description = "Discount created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "discounts"
)]
pub async fn create_discount(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.catalog.create_discount(payload).await?;
    Ok(created_response(created))
}

#[utoipa::path(
    put,
    path = "/api/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount id")),
    request_body = UpdateDiscountRequest,
    responses(
        (status = 200, description = "Discount updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "discounts"
)]
pub async fn update_discount(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateDiscountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.catalog.update_discount(id, payload).await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/discounts/{id}",
    params(("id" = Uuid, Path, description = "Discount id")),
    responses(
        (status = 204, description = "Discount deleted"),
        (status = 404, description = "Discount not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "discounts"
)]
pub async fn delete_discount(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_discount(id).await?;
    Ok(no_content_response())
}
