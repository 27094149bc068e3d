use crate::{
    entities::{inventory, item, order, purchase_order, supplier, user, warehouse},
    errors::ServiceError,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

/// Inventory records below this quantity count as low stock
pub const LOW_STOCK_THRESHOLD: i32 = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FinancialReportQuery {
    /// First day of the range, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Last day of the range (inclusive), `YYYY-MM-DD`
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinancialReport {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub items: u64,
    pub warehouses: u64,
    pub users: u64,
    pub suppliers: u64,
    pub low_stock: u64,
}

fn parse_day(raw: Option<&str>, field: &str) -> Result<NaiveDate, ServiceError> {
    raw.map(str::trim)
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid {} format", field)))
}

/// `[start 00:00, end + 1 day 00:00)` in UTC, so both days are included whole.
fn day_window(start: NaiveDate, end: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let until = end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ServiceError::ValidationError("end_date out of range".into()))?;
    Ok((
        start.and_time(chrono::NaiveTime::MIN).and_utc(),
        until.and_time(chrono::NaiveTime::MIN).and_utc(),
    ))
}

/// UTC calendar day of `orders.date`, as the backend spells it
fn order_day(backend: DatabaseBackend) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => Expr::cust(r#"CAST(("date" AT TIME ZONE 'UTC') AS DATE)"#),
        _ => Expr::cust(r#"date("date")"#),
    }
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Revenue from orders and cost from purchase orders dated within the
    /// range, both ends inclusive.
    #[instrument(skip(self))]
    pub async fn financial(&self, query: &FinancialReportQuery) -> Result<FinancialReport, ServiceError> {
        let start = parse_day(query.start_date.as_deref(), "start_date")?;
        let end = parse_day(query.end_date.as_deref(), "end_date")?;
        let (from, until) = day_window(start, end)?;

        let revenue = order::Entity::find()
            .select_only()
            .column_as(Expr::col(order::Column::TotalAmount).sum(), "revenue")
            .filter(order::Column::Date.gte(from))
            .filter(order::Column::Date.lt(until))
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or_default();

        let cost = purchase_order::Entity::find()
            .select_only()
            .column_as(Expr::col(purchase_order::Column::TotalAmount).sum(), "cost")
            .filter(purchase_order::Column::Date.gte(from))
            .filter(purchase_order::Column::Date.lt(until))
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or_default();

        info!(%start, %end, %revenue, %cost, "financial report generated");
        Ok(FinancialReport {
            revenue,
            cost,
            net_profit: revenue - cost,
        })
    }

    /// Order totals per UTC calendar day, oldest first.
    #[instrument(skip(self))]
    pub async fn sales(&self) -> Result<Vec<DailySales>, ServiceError> {
        let day = order_day(self.db.get_database_backend());
        let rows = order::Entity::find()
            .select_only()
            .column_as(Expr::col(order::Column::Date).min(), "first_at")
            .column_as(Expr::col(order::Column::TotalAmount).sum(), "total_sales")
            .column_as(Expr::col(order::Column::Id).count(), "order_count")
            .group_by(day.clone())
            .order_by_asc(day)
            .into_tuple::<(DateTime<Utc>, Decimal, i64)>()
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(first_at, total_sales, order_count)| DailySales {
                date: first_at.date_naive(),
                total_sales,
                order_count: u64::try_from(order_count).unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db;
        Ok(DashboardSummary {
            items: count::<item::Entity, _>(db).await?,
            warehouses: count::<warehouse::Entity, _>(db).await?,
            users: count::<user::Entity, _>(db).await?,
            suppliers: count::<supplier::Entity, _>(db).await?,
            low_stock: inventory::Entity::find()
                .filter(inventory::Column::Quantity.lt(LOW_STOCK_THRESHOLD))
                .count(db)
                .await?,
        })
    }
}

async fn count<E, C>(conn: &C) -> Result<u64, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    Ok(E::find().count(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_day(Some("2024-13-01"), "start_date").is_err());
        assert!(parse_day(Some("01/02/2024"), "start_date").is_err());
        assert!(parse_day(None, "end_date").is_err());
        assert_eq!(
            parse_day(Some("2024-02-29"), "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn window_covers_the_whole_end_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let (from, until) = day_window(day, day).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_expression_follows_the_backend() {
        use sea_orm::QueryTrait;

        let sql = order::Entity::find()
            .select_only()
            .column_as(Expr::col(order::Column::Id).count(), "n")
            .group_by(order_day(DatabaseBackend::Postgres))
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"GROUP BY CAST(("date" AT TIME ZONE 'UTC') AS DATE)"#), "{sql}");

        let sql = order::Entity::find()
            .select_only()
            .column_as(Expr::col(order::Column::Id).count(), "n")
            .group_by(order_day(DatabaseBackend::Sqlite))
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"GROUP BY date("date")"#), "{sql}");
    }
}
