use super::common::success_response;
use crate::{
    errors::ServiceError,
    services::reports::{DailySales, DashboardSummary, FinancialReport, FinancialReportQuery},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

/// Revenue, cost and net profit over a day range
#[utoipa::path(
    get,
    path = "/api/reports/financial",
    params(FinancialReportQuery),
    responses(
        (status = 200, description = "Financial summary", body = FinancialReport),
        (status = 400, description = "Invalid date", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn financial_report(
    State(state): State<AppState>,
    Query(query): Query<FinancialReportQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.reports.financial(&query).await?;
    Ok(success_response(report))
}

/// Order totals per day
#[utoipa::path(
    get,
    path = "/api/reports/sales",
    responses((status = 200, description = "Daily sales, oldest first", body = [DailySales])),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn sales_report(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let days = state.services.reports.sales().await?;
    Ok(success_response(days))
}

#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    responses((status = 200, description = "Entity counts and low stock", body = DashboardSummary)),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.services.reports.dashboard().await?;
    Ok(success_response(summary))
}
