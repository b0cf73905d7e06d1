//! Report handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::ReportRange;
use crate::services::reports::{DEFAULT_PROFIT_DAYS, ReportService, parse_date, resolve_range};
use crate::state::AppState;

const DEFAULT_TOP_PRODUCTS: u32 = 10;
const MAX_TOP_PRODUCTS: u32 = 100;
const DEFAULT_RATE_HISTORY: u32 = 30;
const MAX_RATE_HISTORY: u32 = 365;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/summary", get(summary))
        .route("/api/sales-by-day", get(sales_by_day))
        .route("/api/top-products", get(top_products))
        .route("/api/sales-by-user", get(sales_by_user))
        .route("/api/status-distribution", get(status_distribution))
        .route("/api/profits", get(profits))
        .route("/api/exchange-rate", get(exchange_rate).post(save_exchange_rate))
}

fn service(state: &AppState) -> ReportService<'_> {
    ReportService::new(state.pool(), state.tables())
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

impl RangeQuery {
    fn range(&self, default_days: u64) -> Result<ReportRange, AppError> {
        let start = parse_date(self.start_date.as_deref(), "start_date")?;
        let end = parse_date(self.end_date.as_deref(), "end_date")?;
        Ok(resolve_range(start, end, ReportService::today(), default_days))
    }
}

/// GET /reports/api/summary
async fn summary(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(1)?;
    let summary = service(&state).summary(range).await?;
    Ok(Json(json!({ "success": true, "period": range, "summary": summary })))
}

/// GET /reports/api/sales-by-day
async fn sales_by_day(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(1)?;
    let days = service(&state).sales_by_day(range).await?;
    Ok(Json(json!({ "success": true, "period": range, "data": days })))
}

/// GET /reports/api/top-products
async fn top_products(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(1)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_PRODUCTS)
        .clamp(1, MAX_TOP_PRODUCTS);
    let products = service(&state).top_products(range, limit).await?;
    Ok(Json(json!({ "success": true, "period": range, "data": products })))
}

/// GET /reports/api/sales-by-user
async fn sales_by_user(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(1)?;
    let users = service(&state).sales_by_user(range).await?;
    Ok(Json(json!({ "success": true, "period": range, "data": users })))
}

/// GET /reports/api/status-distribution
async fn status_distribution(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(1)?;
    let statuses = service(&state).status_distribution(range).await?;
    Ok(Json(json!({ "success": true, "period": range, "data": statuses })))
}

/// GET /reports/api/profits
async fn profits(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let range = query.range(DEFAULT_PROFIT_DAYS)?;
    let report = service(&state).profits(range).await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub fecha: Option<String>,
    pub limit: Option<u32>,
}

/// GET /reports/api/exchange-rate
async fn exchange_rate(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<RateQuery>,
) -> Result<Json<Value>, AppError> {
    let service = service(&state);
    if let Some(fecha) = parse_date(query.fecha.as_deref(), "fecha")? {
        let rate = service.rate_in_force(fecha).await?;
        return Ok(Json(json!({ "success": true, "rate": rate })));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RATE_HISTORY)
        .clamp(1, MAX_RATE_HISTORY);
    let rates = service.recent_rates(limit).await?;
    Ok(Json(json!({ "success": true, "rates": rates })))
}

#[derive(Debug, Deserialize)]
pub struct SaveRateRequest {
    pub fecha: NaiveDate,
    pub tasa_compra: Decimal,
    pub tasa_venta: Decimal,
    pub notas: Option<String>,
}

/// POST /reports/api/exchange-rate
async fn save_exchange_rate(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<SaveRateRequest>,
) -> Result<Json<Value>, AppError> {
    let rate = service(&state)
        .save_rate(
            &admin,
            body.fecha,
            body.tasa_compra,
            body.tasa_venta,
            body.notas.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "success": true, "rate": rate })))
}
