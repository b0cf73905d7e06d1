//! Price maintenance handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{PageRequest, ProductId};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::routes::{non_empty, paginated};
use crate::services::prices::{BulkPriceChange, PriceService};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 500;
const STATS_KEY: &str = "prices";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/stats", get(stats))
        .route("/update/{id}", post(update))
        .route("/update-multiple", post(update_multiple))
        .route("/history/{id}", get(history))
}

fn service(state: &AppState) -> PriceService<'_> {
    PriceService::new(state.pool(), state.tables(), state.uploads_base())
}

#[derive(Debug, Deserialize)]
pub struct PriceListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

/// GET /prices/list
async fn list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<PriceListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let (products, total) = service(&state)
        .list(non_empty(query.search.as_deref()), page)
        .await?;
    Ok(Json(paginated("products", products, page, total)))
}

/// GET /prices/stats
async fn stats(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<Value>, AppError> {
    let stats = state
        .cached_stats(STATS_KEY, || async {
            let stats = service(&state).stats().await?;
            Ok::<_, AppError>(json!(stats))
        })
        .await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    pub regular_price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub reason: String,
}

/// POST /prices/update/{id}
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<u64>,
    AppJson(body): AppJson<PriceUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let update = service(&state)
        .update(
            &user,
            ProductId::new(id),
            body.regular_price,
            body.sale_price,
            &body.reason,
        )
        .await?;
    if update.changed {
        state.invalidate_stats(STATS_KEY).await;
    }
    Ok(Json(json!({ "success": true, "update": update })))
}

#[derive(Debug, Deserialize)]
pub struct BulkPriceRequest {
    #[serde(flatten)]
    pub change: BulkPriceChange,
    #[serde(default)]
    pub reason: String,
}

/// POST /prices/update-multiple
async fn update_multiple(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    AppJson(body): AppJson<BulkPriceRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = service(&state)
        .update_multiple(&user, &body.change, &body.reason)
        .await;
    state.invalidate_stats(STATS_KEY).await;
    Ok(Json(json!({
        "success": true,
        "updated": outcome.updated,
        "errors": outcome.errors,
    })))
}

/// GET /prices/history/{id}
async fn history(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let history = service(&state).history(ProductId::new(id)).await?;
    Ok(Json(json!({ "success": true, "history": history })))
}
