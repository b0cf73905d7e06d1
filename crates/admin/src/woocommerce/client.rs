//! HTTP client for the WooCommerce v3 REST API.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;

use woo_backoffice_core::OrderId;

use super::WooCommerceError;
use super::email_trigger::{OrderTransport, StatusUpdate};
use crate::config::WooCommerceConfig;

/// WooCommerce REST API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct WooCommerceClient {
    inner: Arc<WooCommerceClientInner>,
}

struct WooCommerceClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl std::fmt::Debug for WooCommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooCommerceClient")
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}

impl WooCommerceClient {
    /// Create a client authenticating with the consumer key and secret.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &WooCommerceConfig) -> Result<Self, WooCommerceError> {
        let credentials = STANDARD.encode(format!(
            "{}:{}",
            config.consumer_key,
            config.consumer_secret.expose_secret()
        ));
        let mut auth_value = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| WooCommerceError::Parse(format!("Invalid credentials format: {e}")))?;
        auth_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(WooCommerceClientInner {
                client,
                api_base: config.api_base(),
            }),
        })
    }

    /// Execute a PUT request and discard the response body.
    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), WooCommerceError> {
        let url = format!("{}{path}", self.inner.api_base);
        let response = self.inner.client.put(&url).json(body).send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }
}

impl OrderTransport for WooCommerceClient {
    async fn update_order(
        &self,
        id: OrderId,
        update: &StatusUpdate,
    ) -> Result<(), WooCommerceError> {
        self.put(&format!("/orders/{id}"), update).await
    }
}

/// Map a non-success response to an error.
async fn parse_error(response: reqwest::Response) -> WooCommerceError {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return WooCommerceError::RateLimited { retry_after };
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| "no error message".to_string());

    match status {
        401 | 403 => WooCommerceError::Unauthorized(message),
        404 => WooCommerceError::NotFound(message),
        _ => WooCommerceError::Api { status, message },
    }
}
