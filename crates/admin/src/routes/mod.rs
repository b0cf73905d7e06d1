//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Database reachability
//!
//! # Auth
//! POST /auth/login | /auth/logout | /auth/register | /auth/change-password
//! GET  /auth/profile
//!
//! # Catalog
//! GET  /products/list | /products/stats | /products/{id} | /products/{id}/variations
//! GET  /stock/list | /stock/stats | /stock/history/{id}
//! POST /stock/update/{id} | /stock/update-multiple
//! GET  /prices/list | /prices/stats | /prices/history/{id}
//! POST /prices/update/{id} | /prices/update-multiple (admin)
//! GET  /history/stock | /history/prices
//!
//! # Orders
//! GET  /orders/list | /orders/{id} | /orders/search-products
//! POST /orders/save-order (alias /orders/create)
//!
//! # Expenses (master)
//! GET  /expenses/list | /expenses/stats
//! POST /expenses/create
//! PUT  /expenses/update/{id}
//! DELETE /expenses/delete/{id}
//!
//! # Users (admin)
//! GET  /users/list | /users/stats | /users/{id}
//! POST /users/create | /users/{id}/update | /users/{id}/toggle-status
//! POST /users/{id}/reset-password | /users/{id}/delete
//!
//! # Reports
//! GET  /reports/api/summary | sales-by-day | top-products | sales-by-user
//! GET  /reports/api/status-distribution | profits | exchange-rate
//! POST /reports/api/exchange-rate (admin)
//! ```

pub mod auth;
pub mod expenses;
pub mod health;
pub mod history;
pub mod orders;
pub mod prices;
pub mod products;
pub mod reports;
pub mod stock;
pub mod users;

use axum::Router;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use serde_json::{Value, json};

use woo_backoffice_core::{PageRequest, Pagination};

use crate::services::orders::RequestOrigin;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/stock", stock::router())
        .nest("/prices", prices::router())
        .nest("/history", history::router())
        .nest("/orders", orders::router())
        .nest("/expenses", expenses::router())
        .nest("/users", users::router())
        .nest("/reports", reports::router())
}

/// `{success: true, <key>: items, pagination}`.
pub fn paginated<T: serde::Serialize>(
    key: &str,
    items: T,
    page: PageRequest,
    total: u64,
) -> Value {
    let pagination: Pagination = page.describe(total);
    let mut body = json!({ "success": true, "pagination": pagination });
    body[key] = json!(items);
    body
}

/// Blank query values count as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Client address and user agent for audit columns.
///
/// Behind a proxy the first `X-Forwarded-For` hop is the client.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header("x-real-ip"))
        .map(str::to_string);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    RequestOrigin {
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_request_origin_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("200.1.1.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        let origin = request_origin(&headers);
        assert_eq!(origin.ip_address.as_deref(), Some("200.1.1.1"));
        assert_eq!(origin.user_agent.as_deref(), Some("Mozilla/5.0"));

        assert!(request_origin(&HeaderMap::new()).ip_address.is_none());
    }

    #[test]
    fn test_paginated_body() {
        let page = PageRequest::new(Some(2), Some(10), 20, 100);
        let body = paginated("orders", vec![1, 2], page, 35);
        assert_eq!(body["success"], true);
        assert_eq!(body["orders"], json!([1, 2]));
        assert_eq!(body["pagination"]["pages"], 4);
        assert_eq!(body["pagination"]["prev_num"], 1);
    }
}
