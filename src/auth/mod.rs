/*!
 * # Authentication and Authorization Module
 *
 * Identity and access control for the API:
 *
 * - Registration with Argon2 password hashes
 * - Login issuing HS256 JWT bearer tokens
 * - Per-request principal resolution: user, then role, then permissions,
 *   read fresh from the database on every request
 * - Route guards via [`AuthRouterExt`]
 *
 * A missing or invalid token is a 401; a valid token without the route's
 * permission is a 403.
 */

use crate::{
    config::AppConfig,
    entities::{permission, role, user},
    errors::ServiceError,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub mod password;
pub mod permissions;
pub mod rbac;
mod types;

pub use permissions::consts;
pub use rbac::{PermissionSet, ADMIN_ROLE, STAFF_ROLE};
pub use types::*;

const JWT_ISSUER: &str = "stockroom-auth";
const JWT_AUDIENCE: &str = "stockroom-api";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated principal, resolved fresh for each request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Option<String>,
    pub permissions: PermissionSet,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.allows_permission(permission)
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.allows(permissions::Resources::ALL, permissions::Actions::ALL)
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
    /// Role name given to self-registered users
    pub default_role: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration, default_role: String) -> Self {
        Self {
            jwt_secret,
            jwt_audience: JWT_AUDIENCE.to_string(),
            jwt_issuer: JWT_ISSUER.to_string(),
            token_expiration,
            default_role,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration),
            cfg.default_role.clone(),
        )
    }
}

/// Authentication service that handles registration, login and token checks
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    async fn find_role_id(&self, name: &str) -> Result<Option<Uuid>, ServiceError> {
        Ok(role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .map(|r| r.id))
    }

    async fn create_user(
        &self,
        username: &str,
        password: &str,
        role_name: &str,
    ) -> Result<user::Model, ServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::ValidationError("username is required".into()));
        }
        if password.is_empty() {
            return Err(ServiceError::ValidationError("password is required".into()));
        }

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Username already exists".into()));
        }

        let role_id = self.find_role_id(role_name).await?;
        if role_id.is_none() {
            warn!(role = %role_name, "role not found; user created without a role");
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(password::hash_password(password)?),
            role_id: Set(role_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "Username"))
    }

    /// Creates an account with the configured default role.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<user::Model, ServiceError> {
        let user = self
            .create_user(username, password, &self.config.default_role)
            .await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Creates the admin account unless the username is already taken.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        match self.create_user(username, password, ADMIN_ROLE).await {
            Ok(user) => {
                info!(user_id = %user.id, "admin account created");
                Ok(())
            }
            Err(ServiceError::Conflict(_)) => {
                debug!(username, "admin account already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Checks a username/password pair and issues a token.
    ///
    /// Unknown users and wrong passwords fail identically.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(&*self.db)
            .await?;

        let user = match found {
            Some(user) if password::verify_password(password, &user.password_hash) => user,
            Some(_) => return Err(ServiceError::InvalidCredentials),
            None => {
                password::verify_dummy(password);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        info!(user_id = %user.id, "login succeeded");
        self.issue_token(user.id)
    }

    /// Signs a token for the given user id
    pub fn issue_token(&self, user_id: Uuid) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();
        let lifetime = ChronoDuration::from_std(self.config.token_expiration)
            .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))?;

        Ok(TokenResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs(),
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token has expired".into())
            }
            _ => ServiceError::Unauthorized("Invalid token".into()),
        })
    }

    /// Loads user, role and permission set for a token subject.
    pub async fn load_principal(&self, user_id: Uuid) -> Result<AuthUser, ServiceError> {
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Unknown user".into()))?;

        let role = match user.find_related(role::Entity).one(&*self.db).await? {
            Some(role) => role,
            None => {
                return Ok(AuthUser {
                    user_id: user.id,
                    username: user.username,
                    role: None,
                    permissions: PermissionSet::default(),
                })
            }
        };

        let grants = role.find_related(permission::Entity).all(&*self.db).await?;

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            role: Some(role.name),
            permissions: PermissionSet::new(grants.into_iter().map(|p| (p.resource, p.action))),
        })
    }

    /// Resolves the bearer token in `headers` to a principal.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<AuthUser, ServiceError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token".into()))?;
        self.load_principal(user_id).await
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))
    }
}

/// Authentication middleware that resolves the bearer token into an [`AuthUser`]
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, ServiceError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| ServiceError::InternalError("Authentication service not available".into()))?;

    let user = auth_service.authenticate_headers(request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;

    if !user.has_permission(&required_permission) {
        debug!(user_id = %user.user_id, permission = %required_permission, "permission denied");
        return Err(ServiceError::Forbidden(format!(
            "missing permission {}",
            required_permission
        )));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    /// Authentication runs first, then the permission check.
    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new(
                "unit_test_secret_that_is_long_enough_1234".into(),
                Duration::from_secs(3600),
                STAFF_ROLE.into(),
            ),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    #[test]
    fn issued_token_validates() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let issued = svc.issue_token(user_id).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = svc.validate_token(&issued.token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.aud, JWT_AUDIENCE);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issued = service().issue_token(Uuid::new_v4()).unwrap();
        let mut other = service();
        other.config.jwt_secret = "a_completely_different_secret_value_5678".into();
        let err = other.validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            nbf: now - 7200,
            exp: now - 3600,
            iss: JWT_ISSUER.into(),
            aud: JWT_AUDIENCE.into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(svc.config.jwt_secret.as_bytes()),
        )
        .unwrap();
        let err = svc.validate_token(&token).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: Token has expired");
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
