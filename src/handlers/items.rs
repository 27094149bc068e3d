use super::common::{
    created_response, no_content_response, success_response, JsonBody, MessageResponse,
};
use crate::{
    auth::AuthUser,
    db::ListQuery,
    errors::ServiceError,
    services::{
        catalog::{CreateItemRequest, UpdateItemRequest},
        favorites::FavoriteToggle,
        media::BlobFile,
        reviews::CreateReviewRequest,
    },
    AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// List items
#[utoipa::path(
    get,
    path = "/api/items",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of items"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (default_size, max_size) = state.page_limits();
    let page = state
        .services
        .catalog
        .list_items(&params, default_size, max_size)
        .await?;
    Ok(success_response(page))
}

/// Get an item; each read bumps its viewer count
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item found"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.catalog.view_item(id).await?;
    Ok(success_response(item))
}

/// Create an item
#[utoipa::path(
    post,
    path = "/api/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.catalog.create_item(payload).await?;
    Ok(created_response(item))
}

/// Update an item's descriptive fields
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.catalog.update_item(id, payload).await?;
    Ok(success_response(item))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item is still referenced", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_item(id).await?;
    Ok(no_content_response())
}

/// Reviews for an item, newest first
#[utoipa::path(
    get,
    path = "/api/items/{id}/reviews",
    params(("id" = Uuid, Path, description = "Item id")),
    responses((status = 200, description = "Reviews for the item")),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reviews = state.services.reviews.reviews_for_item(id).await?;
    Ok(Json(reviews))
}

/// Review an item as the calling user
#[utoipa::path(
    post,
    path = "/api/items/{id}/reviews",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created"),
        (status = 400, description = "Invalid rating", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<CreateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let review = state
        .services
        .reviews
        .create_review(user.user_id, id, payload)
        .await?;
    Ok(created_response(review))
}

/// Toggle the calling user's favorite on an item
#[utoipa::path(
    post,
    path = "/api/items/{id}/favorite",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 201, description = "Favorited", body = MessageResponse),
        (status = 200, description = "Unfavorited", body = MessageResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.services.favorites.toggle(user.user_id, id).await?;
    let response = match outcome {
        FavoriteToggle::Favorited => (StatusCode::CREATED, Json(MessageResponse::new("Favorited"))),
        FavoriteToggle::Unfavorited => (StatusCode::OK, Json(MessageResponse::new("Unfavorited"))),
    };
    Ok(response)
}

/// Upload an image or video for an item (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/items/{id}/media",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body(content_type = "multipart/form-data", description = "Form with a `file` part"),
    responses(
        (status = 201, description = "Media stored"),
        (status = 400, description = "No file uploaded", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Upload failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn upload_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let file = read_file_part(multipart).await?;
    info!(item_id = %id, file_name = %file.file_name, size = file.bytes.len(), "media upload received");
    let media = state.services.media.upload_item_media(id, file).await?;
    Ok(created_response(media))
}

async fn read_file_part(mut multipart: Multipart) -> Result<BlobFile, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ValidationError(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::ValidationError(e.body_text()))?;

        return Ok(BlobFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ServiceError::ValidationError("No file uploaded".into()))
}
