//! Product catalog handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{PageRequest, ProductId};

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::routes::{non_empty, paginated};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/stats", get(stats))
        .route("/{id}", get(detail))
        .route("/{id}/variations", get(variations))
}

fn repository(state: &AppState) -> ProductRepository<'_> {
    ProductRepository::new(state.pool(), state.tables(), state.uploads_base())
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// GET /products/list
async fn list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let (mode, products, total) = repository(&state)
        .list(
            non_empty(query.search.as_deref()),
            non_empty(query.status.as_deref()),
            page,
        )
        .await?;

    let mut body = paginated("products", products, page, total);
    body["search_mode"] = json!(mode);
    Ok(Json(body))
}

/// GET /products/stats
async fn stats(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<Json<Value>, AppError> {
    let stats = state
        .cached_stats("products", || async {
            let stats = repository(&state).stats().await?;
            Ok::<_, AppError>(json!(stats))
        })
        .await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// GET /products/{id}
async fn detail(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let id = ProductId::new(id);
    let product = repository(&state)
        .detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// GET /products/{id}/variations
async fn variations(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let variations = repository(&state).variations(ProductId::new(id)).await?;
    Ok(Json(json!({ "success": true, "variations": variations })))
}
