use crate::{
    db::{begin, commit},
    entities::{favorite, item},
    errors::ServiceError,
    services::find_required,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FavoriteToggle {
    Favorited,
    Unfavorited,
}

#[derive(Clone)]
pub struct FavoriteService {
    db: Arc<DatabaseConnection>,
}

impl FavoriteService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Flips the `(user, item)` favorite and moves `favorite_count` with it
    /// in the same transaction. The counter never drops below zero.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user_id: Uuid, item_id: Uuid) -> Result<FavoriteToggle, ServiceError> {
        let txn = begin(&self.db).await?;
        find_required::<item::Entity, _>(&txn, item_id, "Item").await?;

        let existing = favorite::Entity::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::ItemId.eq(item_id))
            .one(&txn)
            .await?;

        let outcome = match existing {
            Some(fav) => {
                fav.delete(&txn).await?;
                item::Entity::update_many()
                    .col_expr(
                        item::Column::FavoriteCount,
                        Expr::col(item::Column::FavoriteCount).sub(1),
                    )
                    .filter(item::Column::Id.eq(item_id))
                    .filter(item::Column::FavoriteCount.gt(0))
                    .exec(&txn)
                    .await?;
                FavoriteToggle::Unfavorited
            }
            None => {
                favorite::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    item_id: Set(item_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await
                .map_err(|e| ServiceError::from_write(e, "Favorite"))?;
                item::Entity::update_many()
                    .col_expr(
                        item::Column::FavoriteCount,
                        Expr::col(item::Column::FavoriteCount).add(1),
                    )
                    .filter(item::Column::Id.eq(item_id))
                    .exec(&txn)
                    .await?;
                FavoriteToggle::Favorited
            }
        };

        commit(txn).await?;
        info!(user_id = %user_id, item_id = %item_id, outcome = ?outcome, "favorite toggled");
        Ok(outcome)
    }
}
