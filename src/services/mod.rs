use crate::errors::ServiceError;
use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};
use uuid::Uuid;

// Stock and the flows that move it
pub mod inventory;
pub mod orders;
pub mod purchase_orders;

// Catalog and engagement
pub mod catalog;
pub mod favorites;
pub mod media;
pub mod reviews;

// Access control administration
pub mod rbac;

// Analytics and Reporting
pub mod reports;

/// Loads a row by primary key or fails with `NotFound`.
pub(crate) async fn find_required<E, C>(
    conn: &C,
    id: Uuid,
    what: &str,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found(what, id))
}
