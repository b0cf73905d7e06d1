//! Authentication route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::extract::AppJson;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::request_origin;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/profile", get(profile))
        .route("/change-password", post(change_password))
}

fn service(state: &AppState) -> AuthService<'_> {
    AuthService::new(
        state.pool(),
        state.config().corporate_email_domain.as_deref(),
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let origin = request_origin(&headers);
    let user = service(&state)
        .login(
            &body.username,
            &body.password,
            origin.ip_address.as_deref(),
            origin.user_agent.as_deref(),
        )
        .await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(user.id.as_u64(), &user.username);

    Ok(Json(json!({ "success": true, "user": user })))
}

/// POST /auth/logout
async fn logout(session: Session) -> Result<Json<Value>, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
    pub password2: String,
}

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let user = service(&state)
        .register(&Registration {
            username: &body.username,
            email: &body.email,
            full_name: body.full_name.as_deref(),
            password: &body.password,
            password2: &body.password2,
        })
        .await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// GET /auth/profile
async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Value>, AppError> {
    let user = service(&state).get_user(current.id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// POST /auth/change-password
async fn change_password(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    service(&state)
        .change_password(
            current.id,
            &body.current_password,
            &body.new_password,
            &body.confirm_password,
        )
        .await?;
    tracing::info!(user_id = %current.id, "password changed");
    Ok(Json(json!({ "success": true })))
}
