//! Stock and price audit logs.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use woo_backoffice_core::{PageRequest, ProductId};

use crate::db::{HistoryFilter, PriceHistoryRepository, StockHistoryRepository};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::routes::{non_empty, paginated};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stock", get(stock))
        .route("/prices", get(prices))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub product_id: Option<u64>,
}

impl HistoryQuery {
    fn filter(&self) -> Result<HistoryFilter, AppError> {
        Ok(HistoryFilter {
            search: non_empty(self.search.as_deref()).map(str::to_string),
            date_from: parse_day(self.date_from.as_deref(), "date_from")?,
            date_to: parse_day(self.date_to.as_deref(), "date_to")?,
            product_id: self.product_id.map(ProductId::new),
        })
    }

    fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE)
    }
}

fn parse_day(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    non_empty(raw)
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| AppError::BadRequest(format!("{field} must be YYYY-MM-DD")))
        })
        .transpose()
}

/// GET /history/stock
async fn stock(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let page = query.page();
    let (history, total) = StockHistoryRepository::new(state.pool(), state.tables())
        .list(&query.filter()?, page)
        .await?;
    Ok(Json(paginated("history", history, page, total)))
}

/// GET /history/prices
async fn prices(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let page = query.page();
    let (history, total) = PriceHistoryRepository::new(state.pool(), state.tables())
        .list(&query.filter()?, page)
        .await?;
    Ok(Json(paginated("history", history, page, total)))
}
