use crate::{
    entities::{item, review},
    errors::ServiceError,
    services::find_required,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create_review(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        req: CreateReviewRequest,
    ) -> Result<review::Model, ServiceError> {
        req.validate()?;
        find_required::<item::Entity, _>(&*self.db, item_id, "Item").await?;

        let model = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            item_id: Set(item_id),
            rating: Set(req.rating),
            comment: Set(req.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(review_id = %model.id, item_id = %item_id, rating = model.rating, "review created");
        Ok(model)
    }

    pub async fn reviews_for_item(&self, item_id: Uuid) -> Result<Vec<review::Model>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::ItemId.eq(item_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
