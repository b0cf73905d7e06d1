//! Session middleware configuration.
//!
//! Sessions live in the `woo_sessions` table of the store database and
//! expire after an hour of inactivity.

use sqlx::MySqlPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::MySqlStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "wbo_session";

/// Session table, created by the migrations.
pub const SESSION_TABLE: &str = "woo_sessions";

/// Inactivity timeout in seconds.
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer with a MySQL store.
///
/// # Errors
///
/// Returns the store's message if the database or table name is rejected.
pub fn create_session_layer(
    pool: &MySqlPool,
    config: &AppConfig,
) -> Result<SessionManagerLayer<MySqlStore>, String> {
    let store = MySqlStore::new(pool.clone())
        .with_schema_name(&config.database.name)?
        .with_table_name(SESSION_TABLE)?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/"))
}
