//! Command implementations.

pub mod auto_increment;
pub mod migrate;
pub mod outbox;
pub mod user;

use sqlx::MySqlPool;
use thiserror::Error;

use woo_backoffice_admin::config::{AppConfig, ConfigError};
use woo_backoffice_admin::db::{self, RepositoryError};
use woo_backoffice_admin::services::AuthError;
use woo_backoffice_admin::woocommerce::WooCommerceError;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Account(#[from] AuthError),

    #[error("WooCommerce error: {0}")]
    WooCommerce(#[from] WooCommerceError),
}

/// Load the server configuration and connect to its database.
pub(crate) async fn connect() -> Result<(AppConfig, MySqlPool), CommandError> {
    let config = AppConfig::from_env()?;
    tracing::info!(database = %config.database.name, "connecting");
    let pool = db::create_pool(&config.database).await?;
    Ok((config, pool))
}
