//! Database migrations.
//!
//! Only the back-office's own tables are migrated (`woo_users`,
//! `expense_details`, `woo_tipo_cambio`, `woo_email_outbox`,
//! `woo_sessions`) plus the two history tables, which carry the WordPress
//! prefix and are therefore created outside the migration files. The
//! WordPress tables themselves belong to WordPress.
//!
//! Migration files live in `crates/admin/migrations/`.

use woo_backoffice_admin::db::schema;

use super::{CommandError, connect};

/// Run every pending migration.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (config, pool) = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;
    schema::ensure_history_tables(&pool, &config.tables).await?;
    tracing::info!(
        stock = %config.tables.stock_history(),
        price = %config.tables.price_history(),
        "history tables ready"
    );
    tracing::info!("Migrations complete");
    Ok(())
}
