//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use sqlx::MySqlPool;

use crate::config::AppConfig;
use crate::db::Tables;
use crate::error::AppError;
use crate::woocommerce::{EmailTrigger, RetryPolicy, WooCommerceClient, WooCommerceError};

/// How long dashboard counters are served from memory.
const STATS_TTL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: MySqlPool,
    uploads_base: String,
    email_trigger: Arc<EmailTrigger<WooCommerceClient>>,
    stats: Cache<&'static str, Value>,
}

impl AppState {
    /// Create the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the WooCommerce HTTP client cannot be built.
    pub fn new(config: AppConfig, pool: MySqlPool) -> Result<Self, WooCommerceError> {
        let client = WooCommerceClient::new(&config.woocommerce)?;
        let email_trigger = Arc::new(EmailTrigger::new(
            client,
            RetryPolicy::default(),
            config.orders.email_trigger_delay,
        ));
        let uploads_base = config.woocommerce.uploads_base();
        let stats = Cache::builder()
            .max_capacity(64)
            .time_to_live(STATS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                uploads_base,
                email_trigger,
                stats,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.inner.pool
    }

    /// Table names for the configured WordPress prefix.
    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.inner.config.tables
    }

    /// Base URL of `wp-content/uploads`, for product images.
    #[must_use]
    pub fn uploads_base(&self) -> &str {
        &self.inner.uploads_base
    }

    #[must_use]
    pub fn email_trigger(&self) -> &Arc<EmailTrigger<WooCommerceClient>> {
        &self.inner.email_trigger
    }

    /// Serve a counter from the stats cache, loading it on a miss.
    ///
    /// Failed loads are not cached.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn cached_stats<F, Fut>(&self, key: &'static str, load: F) -> Result<Value, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>>,
    {
        if let Some(value) = self.inner.stats.get(key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.inner.stats.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Drop a cached counter after a write that changes it.
    pub async fn invalidate_stats(&self, key: &'static str) {
        self.inner.stats.invalidate(key).await;
    }
}
