//! WooCommerce back-office library.
//!
//! A JSON API over the store's WordPress/WooCommerce MySQL database for
//! catalog maintenance, manual order entry, expenses and reports. Built as
//! a library so the server binary, the CLI and the integration tests share
//! one router and one set of repositories.
//!
//! # Security
//!
//! The server holds write access to the store database and the WooCommerce
//! REST credentials. Every route except login, register and health checks
//! requires an operator session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod woocommerce;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::MySqlStore;
use tracing::Span;

use crate::state::AppState;

/// Build the full application: routes, sessions, tracing and Sentry.
pub fn app(state: AppState, session_layer: SessionManagerLayer<MySqlStore>) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
