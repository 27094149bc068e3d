use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw list parameters as they arrive on the query string.
///
/// Numbers are kept as strings so that garbage values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Rows per page (default 10, max 100)
    pub page_size: Option<String>,
    /// Substring matched against the resource's searchable fields
    pub search: Option<String>,
    /// Sort field; must be one of the resource's sortable fields
    pub sort: Option<String>,
    /// `asc` (default) or `desc`
    pub order: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self, default_size: u64, max_size: u64) -> Pagination {
        Pagination::clamp(
            parse_number(self.page.as_deref()),
            parse_number(self.page_size.as_deref()),
            default_size,
            max_size,
        )
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn descending(&self) -> bool {
        self.order
            .as_deref()
            .map(|o| o.eq_ignore_ascii_case("desc"))
            .unwrap_or(false)
    }
}

fn parse_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// Normalised page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Page below 1 becomes 1. A page size above `max_size` is capped, a
    /// missing or non-positive one uses `default_size`.
    pub fn clamp(page: Option<i64>, page_size: Option<i64>, default_size: u64, max_size: u64) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        let page_size = match page_size {
            Some(s) if s > max_size as i64 => max_size,
            Some(s) if s > 0 => s as u64,
            _ => default_size,
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Per-resource allow-lists for search and sort
pub struct SortFields<C: 'static> {
    pub search: &'static [C],
    pub sort: &'static [(&'static str, C)],
}

impl<C: Copy> SortFields<C> {
    pub fn sort_column(&self, key: &str) -> Option<C> {
        self.sort
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, column)| *column)
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(pagination.page_size)
        };
        Self {
            items,
            pagination: PaginationMeta {
                page: pagination.page,
                page_size: pagination.page_size,
                total,
                total_pages,
            },
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Builds a list query: filters, then search, then sort, then page window.
pub struct QueryBuilder<E: EntityTrait> {
    query: Select<E>,
    pagination: Pagination,
    sorted: bool,
}

impl<E: EntityTrait> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> QueryBuilder<E> {
    pub fn new() -> Self {
        Self {
            query: E::find(),
            pagination: Pagination::default(),
            sorted: false,
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query = self.query.filter(condition);
        self
    }

    /// `LIKE %term%` over every listed column, any of which may match.
    pub fn search(mut self, term: Option<&str>, columns: &[E::Column]) -> Self {
        if let Some(term) = term {
            if !columns.is_empty() {
                let condition = columns
                    .iter()
                    .fold(Condition::any(), |acc, column| acc.add(column.contains(term)));
                self.query = self.query.filter(condition);
            }
        }
        self
    }

    /// Sort by an allow-listed field. Unknown fields are ignored.
    pub fn sort(mut self, key: Option<&str>, descending: bool, fields: &SortFields<E::Column>) -> Self {
        if let Some(column) = key.and_then(|k| fields.sort_column(k)) {
            self.query = if descending {
                self.query.order_by_desc(column)
            } else {
                self.query.order_by_asc(column)
            };
            self.sorted = true;
        }
        self
    }

    /// Applies search and sort from the query string using the resource's allow-lists.
    pub fn shape(self, params: &ListQuery, fields: &SortFields<E::Column>) -> Self {
        self.search(params.search_term(), fields.search)
            .sort(params.sort.as_deref(), params.descending(), fields)
    }

    /// Tie-breaker applied when no explicit sort was requested
    pub fn default_order(mut self, column: E::Column) -> Self {
        if !self.sorted {
            self.query = self.query.order_by_asc(column);
        }
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Execute the query and return the requested page with the total row count
    pub async fn fetch<C>(self, db: &C) -> Result<PaginatedResponse<E::Model>, sea_orm::DbErr>
    where
        C: ConnectionTrait,
        E::Model: Send + Sync,
    {
        let total = self.query.clone().count(db).await?;
        let items = self
            .query
            .offset(self.pagination.offset())
            .limit(self.pagination.page_size)
            .all(db)
            .await?;

        Ok(PaginatedResponse::new(items, self.pagination, total))
    }

    pub fn into_select(self) -> Select<E> {
        self.query
    }
}
