//! Unified error handling for the back-office API.
//!
//! Every failure leaves the server as `{"success": false, "error": ...}`.
//! Outside production a 500 also carries `traceback`, the error's source
//! chain with one cause per line.

use std::error::Error as _;
use std::sync::OnceLock;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use woo_backoffice_core::PricingError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::expenses::ExpenseError;
use crate::services::orders::OrderError;
use crate::services::reports::ReportError;
use crate::woocommerce::WooCommerceError;

static ERROR_DETAILS: OnceLock<bool> = OnceLock::new();

/// Enable or disable `traceback` in 500 responses. Only the first call wins.
pub fn set_error_details(enabled: bool) {
    let _ = ERROR_DETAILS.set(enabled);
}

fn error_details() -> bool {
    ERROR_DETAILS.get().copied().unwrap_or(false)
}

/// Application-level error type for the JSON API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order creation failed.
    #[error("Order error: {0}")]
    Order(#[source] OrderError),

    /// WooCommerce REST API call failed.
    #[error("WooCommerce error: {0}")]
    WooCommerce(#[from] WooCommerceError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(message) => Self::BadRequest(message),
            OrderError::ProductNotFound(_) => Self::NotFound(err.to_string()),
            OrderError::Pricing(e) if e != PricingError::LinesMismatch => {
                Self::BadRequest(e.to_string())
            }
            other => Self::Order(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => Self::BadRequest(message),
            CatalogError::ProductNotFound(_) => Self::NotFound(err.to_string()),
            CatalogError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        match err {
            ExpenseError::Validation(message) => Self::BadRequest(message),
            ExpenseError::NotFound => Self::NotFound(err.to_string()),
            ExpenseError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(message) => Self::BadRequest(message),
            ReportError::RateNotFound(_) => Self::NotFound(err.to_string()),
            ReportError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::Inactive | AuthError::NotPermitted(_) => Self::Forbidden(err.to_string()),
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::InvalidEmail(_)
            | AuthError::Validation(_)
            | AuthError::UserAlreadyExists
            | AuthError::WrongPassword => Self::BadRequest(err.to_string()),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::Hash(message) => Self::Internal(message),
        }
    }
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Database(_) | Self::Internal(_) | Self::Order(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::WooCommerce(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Causes below this error, outermost first.
    fn traceback(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = self.source();
        while let Some(cause) = source {
            lines.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        lines.join("\n")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            if error_details() {
                json!({
                    "success": false,
                    "error": self.to_string(),
                    "traceback": self.traceback(),
                })
            } else {
                json!({ "success": false, "error": "Internal server error" })
            }
        } else if status == StatusCode::BAD_GATEWAY {
            json!({ "success": false, "error": "External service error" })
        } else {
            json!({ "success": false, "error": self.to_string() })
        };

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context from an operator.
pub fn set_sentry_user(user_id: u64, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123 not found".to_string());
        assert_eq!(err.to_string(), "order 123 not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_order_errors_are_bad_requests() {
        let err: AppError = OrderError::Validation("items required".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "items required");
    }

    #[test]
    fn test_pricing_errors() {
        let err: AppError = OrderError::Pricing(PricingError::Overflow).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "order amounts are too large");

        let err: AppError = OrderError::Pricing(PricingError::LinesMismatch).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_rate_is_not_found() {
        let fecha = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let err: AppError = ReportError::RateNotFound(fecha).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = ExpenseError::NotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_traceback_lists_sources() {
        let err = AppError::Database(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        let traceback = err.traceback();
        assert!(traceback.starts_with("Database error:"));
        assert!(traceback.contains("caused by:"));
    }

    #[tokio::test]
    async fn test_body_is_json_with_success_false() {
        let response = AppError::BadRequest("bad".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "bad");
    }
}
