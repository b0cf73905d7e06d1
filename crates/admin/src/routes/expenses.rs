//! Expense handlers (master only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{ExpenseId, PageRequest};

use crate::db::ExpenseFilter;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::RequireMaster;
use crate::routes::{non_empty, paginated};
use crate::services::expenses::{ExpenseForm, ExpenseService};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/stats", get(stats))
        .route("/create", post(create))
        .route("/update/{id}", put(update))
        .route("/delete/{id}", delete(remove))
}

fn service(state: &AppState) -> ExpenseService<'_> {
    ExpenseService::new(state.pool())
}

#[derive(Debug, Deserialize)]
pub struct ExpenseListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub tipo_gasto: Option<String>,
    pub categoria: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn parse_day(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    non_empty(raw)
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| AppError::BadRequest(format!("{field} must be YYYY-MM-DD")))
        })
        .transpose()
}

/// GET /expenses/list
async fn list(
    State(state): State<AppState>,
    RequireMaster(_user): RequireMaster,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let text = |value: &Option<String>| non_empty(value.as_deref()).map(str::to_string);
    let filter = ExpenseFilter {
        search: text(&query.search),
        tipo_gasto: text(&query.tipo_gasto),
        categoria: text(&query.categoria),
        date_from: parse_day(query.date_from.as_deref(), "date_from")?,
        date_to: parse_day(query.date_to.as_deref(), "date_to")?,
    };
    let (expenses, total) = service(&state).list(&filter, page).await?;
    Ok(Json(paginated("expenses", expenses, page, total)))
}

/// GET /expenses/stats
async fn stats(
    State(state): State<AppState>,
    RequireMaster(_user): RequireMaster,
) -> Result<Json<Value>, AppError> {
    let stats = service(&state).stats().await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// POST /expenses/create
async fn create(
    State(state): State<AppState>,
    RequireMaster(user): RequireMaster,
    AppJson(form): AppJson<ExpenseForm>,
) -> Result<Json<Value>, AppError> {
    let expense = service(&state).create(&user, form).await?;
    Ok(Json(json!({ "success": true, "expense": expense })))
}

/// PUT /expenses/update/{id}
async fn update(
    State(state): State<AppState>,
    RequireMaster(user): RequireMaster,
    Path(id): Path<u64>,
    AppJson(form): AppJson<ExpenseForm>,
) -> Result<Json<Value>, AppError> {
    let expense = service(&state).update(&user, ExpenseId::new(id), form).await?;
    Ok(Json(json!({ "success": true, "expense": expense })))
}

/// DELETE /expenses/delete/{id}
async fn remove(
    State(state): State<AppState>,
    RequireMaster(user): RequireMaster,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    service(&state).delete(&user, ExpenseId::new(id)).await?;
    Ok(Json(json!({ "success": true })))
}
