//! Database operations against the WooCommerce MySQL schema.
//!
//! # Tables
//!
//! WordPress/WooCommerce tables (prefixed, owned by WordPress):
//! - `posts` / `postmeta` - Products, variations, attachments, legacy orders
//! - `options` - Site options; holds the order-number counter
//! - `wc_orders`, `wc_order_addresses`, `wc_order_operational_data`,
//!   `wc_orders_meta` - HPOS order storage
//! - `woocommerce_order_items` / `woocommerce_order_itemmeta` - Order lines
//!
//! Auxiliary tables (created by this service's migrations):
//! - `woo_users`, `woo_user_login_history` - Operator accounts
//! - `{prefix}stock_history`, `{prefix}price_history` - Append-only audit logs
//! - `expense_details` - Operating expenses
//! - `woo_tipo_cambio` - Daily USD/PEN exchange rates
//! - `woo_email_outbox` - Pending order e-mail triggers
//! - `woo_sessions` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! wbo-cli migrate
//! ```

pub mod email_outbox;
pub mod exchange_rates;
pub mod expenses;
pub mod filter;
pub mod history;
pub mod meta;
pub mod options;
pub mod orders;
pub mod products;
pub mod reports;
pub mod schema;
pub mod users;

use secrecy::ExposeSecret;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use email_outbox::{EmailOutboxRepository, OutboxEntry, OutboxStatus};
pub use exchange_rates::ExchangeRateRepository;
pub use expenses::{ExpenseChanges, ExpenseFilter, ExpenseRepository, NewExpense};
pub use filter::{Filter, placeholders};
pub use history::{HistoryFilter, PriceHistoryRepository, StockHistoryRepository};
pub use options::OptionRepository;
pub use orders::{OrderFilter, OrderRepository};
pub use products::ProductRepository;
pub use reports::ReportRepository;
pub use users::{NewUser, UserFilter, UserRepository, UserStats};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a duplicate-key failure to `Conflict`, keep anything else as is.
    pub(crate) fn from_insert(error: sqlx::Error, what: &str) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{what} already exists"))
            }
            _ => Self::Database(error),
        }
    }
}

/// Create a MySQL connection pool sized for the environment.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    pool_options(config)
        .connect(config.url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    pool_options(config).connect_lazy(config.url.expose_secret())
}

fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .test_before_acquire(true)
}

/// The table prefix is not a plain identifier.
#[derive(Debug, Error)]
#[error("table prefix must contain only ASCII letters, digits and underscores: {0:?}")]
pub struct InvalidTablePrefix(String);

/// Fully qualified names of the prefixed WordPress tables.
///
/// Table names cannot be bound as query parameters, so every query that
/// touches a prefixed table formats its name from here. The prefix is
/// validated once; nothing else is ever interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    prefix: String,
}

impl Tables {
    /// # Errors
    ///
    /// Returns [`InvalidTablePrefix`] if `prefix` is empty or contains
    /// anything but `[A-Za-z0-9_]`.
    pub fn new(prefix: &str) -> Result<Self, InvalidTablePrefix> {
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(InvalidTablePrefix(prefix.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn table(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    #[must_use]
    pub fn posts(&self) -> String {
        self.table("posts")
    }

    #[must_use]
    pub fn postmeta(&self) -> String {
        self.table("postmeta")
    }

    #[must_use]
    pub fn options(&self) -> String {
        self.table("options")
    }

    #[must_use]
    pub fn wc_orders(&self) -> String {
        self.table("wc_orders")
    }

    #[must_use]
    pub fn wc_order_addresses(&self) -> String {
        self.table("wc_order_addresses")
    }

    #[must_use]
    pub fn wc_order_operational_data(&self) -> String {
        self.table("wc_order_operational_data")
    }

    #[must_use]
    pub fn wc_orders_meta(&self) -> String {
        self.table("wc_orders_meta")
    }

    #[must_use]
    pub fn order_items(&self) -> String {
        self.table("woocommerce_order_items")
    }

    #[must_use]
    pub fn order_itemmeta(&self) -> String {
        self.table("woocommerce_order_itemmeta")
    }

    #[must_use]
    pub fn stock_history(&self) -> String {
        self.table("stock_history")
    }

    #[must_use]
    pub fn price_history(&self) -> String {
        self.table("price_history")
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_use_prefix() {
        let tables = Tables::new("wpyz_").unwrap();
        assert_eq!(tables.posts(), "wpyz_posts");
        assert_eq!(tables.wc_orders_meta(), "wpyz_wc_orders_meta");
        assert_eq!(tables.order_itemmeta(), "wpyz_woocommerce_order_itemmeta");
        assert_eq!(tables.stock_history(), "wpyz_stock_history");
    }

    #[test]
    fn test_tables_reject_unsafe_prefix() {
        assert!(Tables::new("").is_err());
        assert!(Tables::new("wp_; DROP TABLE x").is_err());
        assert!(Tables::new("wp-").is_err());
        assert!(Tables::new("wp_2_").is_ok());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("polo"), "%polo%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
