use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::{AuthUser, LoginRequest, MeResponse, RegisterRequest, TokenResponse, UserResponse},
    errors::ServiceError,
    AppState,
};
use axum::{extract::State, response::IntoResponse};
use tracing::info;
use validator::Validate;

/// Create an account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let user = state
        .auth
        .register(payload.username.trim(), &payload.password)
        .await?;
    Ok(created_response(UserResponse::from(user)))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let token = state
        .auth
        .authenticate(&payload.username, &payload.password)
        .await?;
    Ok(success_response(token))
}

/// The calling user with its role and permissions
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(user: AuthUser) -> Result<impl IntoResponse, ServiceError> {
    info!(user_id = %user.user_id, "principal requested");
    Ok(success_response(MeResponse {
        id: user.user_id,
        username: user.username,
        role: user.role,
        permissions: user.permissions.to_strings(),
    }))
}
