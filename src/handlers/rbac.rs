use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::UserResponse,
    errors::ServiceError,
    services::rbac::{
        AssignPermissionsRequest, AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/rbac/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created"),
        (status = 409, description = "Role already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn create_role(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state.services.rbac.create_role(payload).await?;
    Ok(created_response(role))
}

/// Roles with their permissions
#[utoipa::path(
    get,
    path = "/api/rbac/roles",
    responses((status = 200, description = "All roles")),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let roles = state.services.rbac.list_roles().await?;
    Ok(success_response(roles))
}

#[utoipa::path(
    post,
    path = "/api/rbac/permissions",
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created"),
        (status = 409, description = "Permission already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn create_permission(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreatePermissionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let permission = state.services.rbac.create_permission(payload).await?;
    Ok(created_response(permission))
}

#[utoipa::path(
    get,
    path = "/api/rbac/permissions",
    responses((status = 200, description = "All permissions")),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let permissions = state.services.rbac.list_permissions().await?;
    Ok(success_response(permissions))
}

/// Replace the permissions granted to a role
#[utoipa::path(
    post,
    path = "/api/rbac/roles/{id}/permissions",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = AssignPermissionsRequest,
    responses(
        (status = 200, description = "Role with its new permissions"),
        (status = 404, description = "Role not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn assign_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    JsonBody(payload): JsonBody<AssignPermissionsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let role = state
        .services
        .rbac
        .assign_permissions(role_id, payload.permission_ids)
        .await?;
    Ok(success_response(role))
}

#[utoipa::path(
    post,
    path = "/api/rbac/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "User with the new role", body = UserResponse),
        (status = 404, description = "User or role not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "rbac"
)]
pub async fn assign_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    JsonBody(payload): JsonBody<AssignRoleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .rbac
        .assign_role(user_id, payload.role_id)
        .await?;
    Ok(success_response(UserResponse::from(user)))
}
