//! Catalog CRUD: items, categories, warehouses, suppliers and discounts.

use crate::{
    db::{ListQuery, PaginatedResponse, QueryBuilder, SortFields},
    entities::{category, discount, item, supplier, warehouse},
    errors::ServiceError,
    services::find_required,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

const ITEM_FIELDS: SortFields<item::Column> = SortFields {
    search: &[item::Column::Name, item::Column::Description],
    sort: &[
        ("name", item::Column::Name),
        ("price", item::Column::Price),
        ("created_at", item::Column::CreatedAt),
    ],
};

const CATEGORY_FIELDS: SortFields<category::Column> = SortFields {
    search: &[category::Column::Name, category::Column::Description],
    sort: &[("name", category::Column::Name)],
};

const WAREHOUSE_FIELDS: SortFields<warehouse::Column> = SortFields {
    search: &[warehouse::Column::Name, warehouse::Column::Location],
    sort: &[
        ("name", warehouse::Column::Name),
        ("capacity", warehouse::Column::Capacity),
    ],
};

const SUPPLIER_FIELDS: SortFields<supplier::Column> = SortFields {
    search: &[
        supplier::Column::Name,
        supplier::Column::ContactInfo,
        supplier::Column::Address,
    ],
    sort: &[("name", supplier::Column::Name)],
};

const DISCOUNT_FIELDS: SortFields<discount::Column> = SortFields {
    search: &[discount::Column::Name],
    sort: &[
        ("name", discount::Column::Name),
        ("percentage", discount::Column::Percentage),
        ("start_date", discount::Column::StartDate),
    ],
};

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("non_negative"));
    }
    Ok(())
}

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Counters are not writable here
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub location: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub capacity: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 0))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_info: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub contact_info: Option<String>,
    pub address: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(custom = "validate_percentage")]
    #[schema(value_type = String, example = "15")]
    pub percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDiscountRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(custom = "validate_percentage")]
    #[schema(value_type = Option<String>)]
    pub percentage: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

fn check_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::ValidationError(
            "end_date must not be before start_date".into(),
        ));
    }
    Ok(())
}

/// Catalog persistence; every method validates its input first
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn check_item_refs(
        &self,
        category_id: Option<Uuid>,
        supplier_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            find_required::<category::Entity, _>(&*self.db, id, "Category").await?;
        }
        if let Some(id) = supplier_id {
            find_required::<supplier::Entity, _>(&*self.db, id, "Supplier").await?;
        }
        Ok(())
    }

    // Items

    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_item(&self, req: CreateItemRequest) -> Result<item::Model, ServiceError> {
        req.validate()?;
        self.check_item_refs(req.category_id, req.supplier_id).await?;

        let now = Utc::now();
        let model = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            description: Set(req.description),
            price: Set(req.price),
            category_id: Set(req.category_id),
            supplier_id: Set(req.supplier_id),
            viewer_count: Set(0),
            favorite_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(item_id = %model.id, "item created");
        Ok(model)
    }

    /// Returns the item and counts the view.
    pub async fn view_item(&self, id: Uuid) -> Result<item::Model, ServiceError> {
        let result = item::Entity::update_many()
            .col_expr(
                item::Column::ViewerCount,
                Expr::col(item::Column::ViewerCount).add(1),
            )
            .filter(item::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Item", id));
        }
        find_required::<item::Entity, _>(&*self.db, id, "Item").await
    }

    pub async fn list_items(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<item::Model>, ServiceError> {
        Ok(QueryBuilder::<item::Entity>::new()
            .shape(params, &ITEM_FIELDS)
            .default_order(item::Column::CreatedAt)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }

    #[instrument(skip(self, req))]
    pub async fn update_item(
        &self,
        id: Uuid,
        req: UpdateItemRequest,
    ) -> Result<item::Model, ServiceError> {
        req.validate()?;
        let existing = find_required::<item::Entity, _>(&*self.db, id, "Item").await?;
        self.check_item_refs(req.category_id, req.supplier_id).await?;

        let mut model = existing.into_active_model();
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(description) = req.description {
            model.description = Set(Some(description));
        }
        if let Some(price) = req.price {
            model.price = Set(price);
        }
        if let Some(category_id) = req.category_id {
            model.category_id = Set(Some(category_id));
        }
        if let Some(supplier_id) = req.supplier_id {
            model.supplier_id = Set(Some(supplier_id));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        info!(item_id = %id, "item updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        delete_row::<item::Entity>(&self.db, id, "Item").await
    }

    // Categories

    pub async fn create_category(
        &self,
        req: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        req.validate()?;
        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            description: Set(req.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(category_id = %model.id, "category created");
        Ok(model)
    }

    pub async fn list_categories(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<category::Model>, ServiceError> {
        Ok(QueryBuilder::<category::Entity>::new()
            .shape(params, &CATEGORY_FIELDS)
            .default_order(category::Column::Name)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        req.validate()?;
        let mut model = find_required::<category::Entity, _>(&*self.db, id, "Category")
            .await?
            .into_active_model();
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(description) = req.description {
            model.description = Set(Some(description));
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        delete_row::<category::Entity>(&self.db, id, "Category").await
    }

    // Warehouses

    pub async fn create_warehouse(
        &self,
        req: CreateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        req.validate()?;
        let now = Utc::now();
        let model = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            location: Set(req.location),
            capacity: Set(req.capacity),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(warehouse_id = %model.id, "warehouse created");
        Ok(model)
    }

    pub async fn list_warehouses(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<warehouse::Model>, ServiceError> {
        Ok(QueryBuilder::<warehouse::Entity>::new()
            .shape(params, &WAREHOUSE_FIELDS)
            .default_order(warehouse::Column::Name)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }

    pub async fn update_warehouse(
        &self,
        id: Uuid,
        req: UpdateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        req.validate()?;
        let mut model = find_required::<warehouse::Entity, _>(&*self.db, id, "Warehouse")
            .await?
            .into_active_model();
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(location) = req.location {
            model.location = Set(Some(location));
        }
        if let Some(capacity) = req.capacity {
            model.capacity = Set(capacity);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn delete_warehouse(&self, id: Uuid) -> Result<(), ServiceError> {
        delete_row::<warehouse::Entity>(&self.db, id, "Warehouse").await
    }

    // Suppliers

    pub async fn create_supplier(
        &self,
        req: CreateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        req.validate()?;
        let now = Utc::now();
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            contact_info: Set(req.contact_info),
            address: Set(req.address),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(supplier_id = %model.id, "supplier created");
        Ok(model)
    }

    pub async fn list_suppliers(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<supplier::Model>, ServiceError> {
        Ok(QueryBuilder::<supplier::Entity>::new()
            .shape(params, &SUPPLIER_FIELDS)
            .default_order(supplier::Column::Name)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }

    pub async fn update_supplier(
        &self,
        id: Uuid,
        req: UpdateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        req.validate()?;
        let mut model = find_required::<supplier::Entity, _>(&*self.db, id, "Supplier")
            .await?
            .into_active_model();
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(contact_info) = req.contact_info {
            model.contact_info = Set(Some(contact_info));
        }
        if let Some(address) = req.address {
            model.address = Set(Some(address));
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn delete_supplier(&self, id: Uuid) -> Result<(), ServiceError> {
        delete_row::<supplier::Entity>(&self.db, id, "Supplier").await
    }

    // Discounts

    pub async fn create_discount(
        &self,
        req: CreateDiscountRequest,
    ) -> Result<discount::Model, ServiceError> {
        req.validate()?;
        check_date_range(req.start_date, req.end_date)?;
        let now = Utc::now();
        let model = discount::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(req.name),
            percentage: Set(req.percentage),
            start_date: Set(req.start_date),
            end_date: Set(req.end_date),
            active: Set(req.active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(discount_id = %model.id, "discount created");
        Ok(model)
    }

    pub async fn list_discounts(
        &self,
        params: &ListQuery,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<PaginatedResponse<discount::Model>, ServiceError> {
        Ok(QueryBuilder::<discount::Entity>::new()
            .shape(params, &DISCOUNT_FIELDS)
            .default_order(discount::Column::StartDate)
            .paginate(params.pagination(default_page_size, max_page_size))
            .fetch(&*self.db)
            .await?)
    }

    pub async fn update_discount(
        &self,
        id: Uuid,
        req: UpdateDiscountRequest,
    ) -> Result<discount::Model, ServiceError> {
        req.validate()?;
        let existing = find_required::<discount::Entity, _>(&*self.db, id, "Discount").await?;
        check_date_range(
            req.start_date.unwrap_or(existing.start_date),
            req.end_date.unwrap_or(existing.end_date),
        )?;

        let mut model = existing.into_active_model();
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(percentage) = req.percentage {
            model.percentage = Set(percentage);
        }
        if let Some(start_date) = req.start_date {
            model.start_date = Set(start_date);
        }
        if let Some(end_date) = req.end_date {
            model.end_date = Set(end_date);
        }
        if let Some(active) = req.active {
            model.active = Set(active);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db).await?)
    }

    pub async fn delete_discount(&self, id: Uuid) -> Result<(), ServiceError> {
        delete_row::<discount::Entity>(&self.db, id, "Discount").await
    }
}

async fn delete_row<E>(db: &DatabaseConnection, id: Uuid, what: &str) -> Result<(), ServiceError>
where
    E: EntityTrait,
    E::PrimaryKey: sea_orm::PrimaryKeyTrait<ValueType = Uuid>,
{
    let result = E::delete_by_id(id)
        .exec(db)
        .await
        .map_err(|e| ServiceError::from_write(e, what))?;
    if result.rows_affected == 0 {
        return Err(ServiceError::not_found(what, id));
    }
    info!(id = %id, entity = what, "deleted");
    Ok(())
}
