//! Operator account handlers (admin only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use woo_backoffice_core::{PageRequest, UserId, UserRole};

use crate::db::UserFilter;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::RequireAdmin;
use crate::routes::{non_empty, paginated};
use crate::services::users::{NewAccount, ProfileChanges, UserService};
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/stats", get(stats))
        .route("/create", post(create))
        .route("/{id}", get(detail))
        .route("/{id}/update", post(update))
        .route("/{id}/toggle-status", post(toggle_status))
        .route("/{id}/reset-password", post(reset_password))
        .route("/{id}/delete", post(remove))
}

fn service(state: &AppState) -> UserService<'_> {
    UserService::new(
        state.pool(),
        state.config().corporate_email_domain.as_deref(),
    )
}

fn parse_role(raw: &str) -> Result<UserRole, AppError> {
    raw.parse::<UserRole>()
        .map_err(|_| AppError::BadRequest(format!("invalid role: {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    /// `active` or `inactive`.
    pub status: Option<String>,
}

/// GET /users/list
async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let filter = UserFilter {
        search: non_empty(query.search.as_deref()).map(str::to_string),
        role: non_empty(query.role.as_deref()).map(parse_role).transpose()?,
        is_active: match non_empty(query.status.as_deref()) {
            Some("active") => Some(true),
            Some("inactive") => Some(false),
            _ => None,
        },
    };
    let (users, total) = service(&state).list(&filter, page).await?;
    Ok(Json(paginated("users", users, page, total)))
}

/// GET /users/stats
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Value>, AppError> {
    let stats = service(&state).stats().await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// POST /users/create
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let role = non_empty(body.role.as_deref())
        .map(parse_role)
        .transpose()?
        .unwrap_or_default();
    let user = service(&state)
        .create(
            &admin,
            &NewAccount {
                username: &body.username,
                email: &body.email,
                full_name: body.full_name.as_deref(),
                password: &body.password,
                role,
            },
        )
        .await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// GET /users/{id}
async fn detail(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let (user, logins) = service(&state).detail(UserId::new(id)).await?;
    Ok(Json(json!({ "success": true, "user": user, "recent_logins": logins })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

/// POST /users/{id}/update
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<u64>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let changes = ProfileChanges {
        email: non_empty(body.email.as_deref()),
        full_name: body.full_name.as_deref(),
        role: non_empty(body.role.as_deref()).map(parse_role).transpose()?,
    };
    let user = service(&state)
        .update(&admin, UserId::new(id), &changes)
        .await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// POST /users/{id}/toggle-status
async fn toggle_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let active = service(&state)
        .toggle_status(&admin, UserId::new(id))
        .await?;
    Ok(Json(json!({ "success": true, "is_active": active })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// POST /users/{id}/reset-password
async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<u64>,
    AppJson(body): AppJson<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    service(&state)
        .reset_password(UserId::new(id), &body.new_password)
        .await?;
    tracing::info!(user_id = id, reset_by = %admin.username, "password reset");
    Ok(Json(json!({ "success": true })))
}

/// POST /users/{id}/delete
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let username = service(&state).delete(&admin, UserId::new(id)).await?;
    Ok(Json(json!({ "success": true, "username": username })))
}
