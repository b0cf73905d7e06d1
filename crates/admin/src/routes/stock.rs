//! Stock maintenance handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{PageRequest, ProductId};

use crate::db::products::StockFilter;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::RequireAuth;
use crate::routes::{non_empty, paginated};
use crate::services::stock::{StockChange, StockService};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 500;
const DEFAULT_LOW_THRESHOLD: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/stats", get(stats))
        .route("/update/{id}", post(update))
        .route("/update-multiple", post(update_multiple))
        .route("/history/{id}", get(history))
}

fn service(state: &AppState) -> StockService<'_> {
    StockService::new(state.pool(), state.tables(), state.uploads_base())
}

#[derive(Debug, Deserialize)]
pub struct StockListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub stock_filter: Option<String>,
    pub low_threshold: Option<i64>,
}

/// GET /stock/list
async fn list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<StockListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let filter = StockFilter::from_query(
        non_empty(query.stock_filter.as_deref()),
        query.low_threshold.unwrap_or(DEFAULT_LOW_THRESHOLD),
    );
    let (products, total) = service(&state)
        .list(query.search.as_deref(), filter, page)
        .await?;
    Ok(Json(paginated("products", products, page, total)))
}

/// GET /stock/stats
async fn stats(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<Value>, AppError> {
    let published = state
        .cached_stats("stock", || async {
            let count = service(&state).published_count().await?;
            Ok::<_, AppError>(json!(count))
        })
        .await?;
    Ok(Json(json!({ "success": true, "stats": { "total_products": published } })))
}

/// `stock` arrives as JSON; anything but a whole number is a 400.
#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub stock: Value,
    #[serde(default)]
    pub reason: String,
}

fn parse_stock_value(value: &Value) -> Result<i64, AppError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::BadRequest("stock must be a whole number".into()))
}

/// POST /stock/update/{id}
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<u64>,
    AppJson(body): AppJson<StockUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let stock = parse_stock_value(&body.stock)?;
    let update = service(&state)
        .update(&user, ProductId::new(id), stock, &body.reason)
        .await?;
    Ok(Json(json!({
        "success": true,
        "product_id": update.product_id,
        "old_stock": update.old_stock,
        "new_stock": update.new_stock,
        "changed": update.changed,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StockBatchItem {
    pub id: u64,
    pub stock: Value,
}

#[derive(Debug, Deserialize)]
pub struct StockBatchRequest {
    pub products: Vec<StockBatchItem>,
    #[serde(default)]
    pub reason: String,
}

/// POST /stock/update-multiple
async fn update_multiple(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<StockBatchRequest>,
) -> Result<Json<Value>, AppError> {
    if body.products.is_empty() {
        return Err(AppError::BadRequest("no products given".into()));
    }
    let mut changes = Vec::with_capacity(body.products.len());
    let mut invalid = Vec::new();
    for item in &body.products {
        match parse_stock_value(&item.stock) {
            Ok(stock) => changes.push(StockChange {
                id: ProductId::new(item.id),
                stock,
            }),
            Err(e) => invalid.push(json!({ "id": item.id, "error": e.to_string() })),
        }
    }

    let outcome = service(&state)
        .update_multiple(&user, &changes, &body.reason)
        .await;
    let mut errors = json!(outcome.errors);
    if let Some(list) = errors.as_array_mut() {
        list.extend(invalid);
    }
    Ok(Json(json!({
        "success": true,
        "updated": outcome.updated,
        "errors": errors,
    })))
}

/// GET /stock/history/{id}
async fn history(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let history = service(&state).history(ProductId::new(id)).await?;
    Ok(Json(json!({ "success": true, "history": history })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stock_value() {
        assert_eq!(parse_stock_value(&json!(12)).unwrap(), 12);
        assert_eq!(parse_stock_value(&json!(" 7 ")).unwrap(), 7);
        assert!(parse_stock_value(&json!(1.5)).is_err());
        assert!(parse_stock_value(&json!("abc")).is_err());
        assert!(parse_stock_value(&Value::Null).is_err());
    }
}
