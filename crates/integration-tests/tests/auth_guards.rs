//! Access control on the HTTP surface.
//!
//! None of these requests carry a session cookie, so the guards answer
//! before anything touches the database.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::json;

use woo_backoffice_integration_tests::{json_body, json_request, send};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let response = send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = send(get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_order_list_requires_login() {
    let response = send(get("/orders/list")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn test_save_order_requires_login() {
    let order = json!({
        "customer": {
            "first_name": "Juan",
            "last_name": "Pérez",
            "phone": "987654321",
            "address_1": "Av. Principal 123",
            "city": "Lima",
            "state": "LIM",
        },
        "items": [{ "product_id": 1, "quantity": 2, "price": "59.00" }],
        "shipping_cost": "10.00",
        "discount_percentage": "10",
    });
    let response = send(json_request("POST", "/orders/save-order", &order)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_guard_runs_before_body_validation() {
    let response = send(json_request("POST", "/orders/save-order", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_missing_field_is_a_json_bad_request() {
    let response = send(json_request("POST", "/auth/login", &json!({ "username": "ana" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("password"), "{body}");
}

#[tokio::test]
async fn test_malformed_json_is_a_json_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{\"username\": "))
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_catalog_routes_require_login() {
    for uri in [
        "/products/list",
        "/stock/list",
        "/prices/list",
        "/history/stock",
        "/reports/api/summary",
        "/auth/profile",
    ] {
        let response = send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_restricted_sections_require_login() {
    for uri in ["/expenses/list", "/expenses/stats", "/users/list", "/users/stats"] {
        let response = send(get(uri)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["success"], false, "{uri}");
    }
}

#[tokio::test]
async fn test_exchange_rate_write_requires_login() {
    let rate = json!({ "fecha": "2026-10-18", "tasa_compra": "3.70", "tasa_venta": "3.74" });
    let response = send(json_request("POST", "/reports/api/exchange-rate", &rate)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(get("/wp-admin/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
