//! Order handlers: list, detail, product search and manual creation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{OrderId, OrderStatus, PageRequest};

use crate::db::OrderFilter;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::RequireAuth;
use crate::routes::{non_empty, paginated, request_origin};
use crate::services::orders::{OrderRequest, OrderService};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/search-products", get(search_products))
        .route("/save-order", post(save_order))
        .route("/create", post(save_order))
        .route("/{id}", get(detail))
}

fn service(state: &AppState) -> OrderService<'_> {
    OrderService::new(
        state.pool(),
        state.tables(),
        &state.config().orders,
        state.uploads_base(),
    )
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// GET /orders/list
async fn list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let status = non_empty(query.status.as_deref())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;
    let filter = OrderFilter {
        search: non_empty(query.search.as_deref()).map(str::to_string),
        status,
    };
    let (orders, total) = service(&state).list(&filter, page).await?;
    Ok(Json(paginated("orders", orders, page, total)))
}

/// GET /orders/{id}
async fn detail(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let id = OrderId::new(id);
    let order = service(&state)
        .detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    Ok(Json(json!({ "success": true, "order": order })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /orders/search-products
async fn search_products(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let products = service(&state).search_products(&query.q).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

/// POST /orders/save-order
async fn save_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    AppJson(request): AppJson<OrderRequest>,
) -> Result<Json<Value>, AppError> {
    let origin = request_origin(&headers);

    let created = service(&state)
        .create(&request, &user, &origin, state.email_trigger())
        .await?;

    Ok(Json(json!({
        "success": true,
        "order_id": created.order_id,
        "order_number": created.order_number,
        "total": created.total,
        "tax": created.tax,
        "subtotal": created.subtotal,
    })))
}
