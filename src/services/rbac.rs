//! Role and permission administration.

use crate::{
    db::{begin, commit},
    entities::{permission, role, role_permission, user},
    errors::ServiceError,
    services::find_required,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 64))]
    pub resource: String,
    #[validate(length(min = 1, max = 32))]
    pub action: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignPermissionsRequest {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

/// A role together with its grants
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: role::Model,
    pub permissions: Vec<permission::Model>,
}

#[derive(Clone)]
pub struct RbacService {
    db: Arc<DatabaseConnection>,
}

impl RbacService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_role(&self, req: CreateRoleRequest) -> Result<role::Model, ServiceError> {
        req.validate()?;
        let exists = role::Entity::find()
            .filter(role::Column::Name.eq(req.name.as_str()))
            .one(&*self.db)
            .await?
            .is_some();
        if exists {
            return Err(ServiceError::Conflict("Role already exists".into()));
        }

        let model = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            description: Set(req.description),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write(e, "Role"))?;

        info!(role_id = %model.id, "role created");
        Ok(model)
    }

    /// All roles, each carrying its granted permissions.
    pub async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>, ServiceError> {
        let rows = role::Entity::find()
            .order_by_asc(role::Column::Name)
            .find_with_related(permission::Entity)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(role, mut permissions)| {
                permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
                RoleWithPermissions { role, permissions }
            })
            .collect())
    }

    #[instrument(skip(self, req), fields(resource = %req.resource, action = %req.action))]
    pub async fn create_permission(
        &self,
        req: CreatePermissionRequest,
    ) -> Result<permission::Model, ServiceError> {
        req.validate()?;
        let model = permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            resource: Set(req.resource),
            action: Set(req.action),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write(e, "Permission"))?;

        info!(permission_id = %model.id, "permission created");
        Ok(model)
    }

    pub async fn list_permissions(&self) -> Result<Vec<permission::Model>, ServiceError> {
        Ok(permission::Entity::find()
            .order_by_asc(permission::Column::Resource)
            .order_by_asc(permission::Column::Action)
            .all(&*self.db)
            .await?)
    }

    /// Replaces the role's permission set. Ids that match no permission
    /// are skipped.
    #[instrument(skip(self, permission_ids), fields(requested = permission_ids.len()))]
    pub async fn assign_permissions(
        &self,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> Result<RoleWithPermissions, ServiceError> {
        let txn = begin(&self.db).await?;
        let role = find_required::<role::Entity, _>(&txn, role_id, "Role").await?;

        let permissions = if permission_ids.is_empty() {
            Vec::new()
        } else {
            permission::Entity::find()
                .filter(permission::Column::Id.is_in(permission_ids))
                .order_by_asc(permission::Column::Resource)
                .order_by_asc(permission::Column::Action)
                .all(&txn)
                .await?
        };

        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;

        if !permissions.is_empty() {
            let links = permissions.iter().map(|p| role_permission::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(p.id),
            });
            role_permission::Entity::insert_many(links)
                .exec_without_returning(&txn)
                .await?;
        }

        commit(txn).await?;
        info!(role_id = %role_id, granted = permissions.len(), "role permissions replaced");
        Ok(RoleWithPermissions { role, permissions })
    }

    #[instrument(skip(self))]
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<user::Model, ServiceError> {
        let found = find_required::<user::Entity, _>(&*self.db, user_id, "User").await?;
        find_required::<role::Entity, _>(&*self.db, role_id, "Role").await?;

        let mut active = found.into_active_model();
        active.role_id = Set(Some(role_id));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(user_id = %user_id, role_id = %role_id, "role assigned");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_is_required() {
        let req = CreateRoleRequest {
            name: String::new(),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn permission_parts_are_required() {
        let ok = CreatePermissionRequest {
            resource: "items".into(),
            action: "read".into(),
        };
        assert!(ok.validate().is_ok());

        let missing_action = CreatePermissionRequest {
            resource: "items".into(),
            action: String::new(),
        };
        assert!(missing_action.validate().is_err());
    }
}
