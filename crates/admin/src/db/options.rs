//! WordPress `options` table: the order-number counter and transients.

use sqlx::{MySqlConnection, MySqlPool};

use super::{RepositoryError, Tables};

/// Option row holding the last issued manual order number.
pub const ORDER_COUNTER_OPTION: &str = "woo_backoffice_order_counter";

/// Repository for the `options` table.
pub struct OptionRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
}

impl<'a> OptionRepository<'a> {
    /// Create a new option repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self { pool, tables }
    }

    /// Read an option value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, name: &str) -> Result<Option<String>, RepositoryError> {
        let value: Option<String> = sqlx::query_scalar(&format!(
            "SELECT option_value FROM {} WHERE option_name = ?",
            self.tables.options()
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(value)
    }

    /// Delete the WooCommerce transients cached for orders and reports.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_order_transients(&self) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        delete_order_transients(&mut conn, self.tables).await
    }
}

/// Lock the counter row for the rest of the transaction and return its value.
///
/// The row is created with `INSERT IGNORE` on first use, so concurrent
/// first callers still serialize on the same row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn lock_counter(
    conn: &mut MySqlConnection,
    tables: &Tables,
    name: &str,
) -> Result<Option<String>, RepositoryError> {
    let options = tables.options();
    sqlx::query(&format!(
        "INSERT IGNORE INTO {options} (option_name, option_value, autoload) VALUES (?, '0', 'no')"
    ))
    .bind(name)
    .execute(&mut *conn)
    .await?;

    let value: Option<String> = sqlx::query_scalar(&format!(
        "SELECT option_value FROM {options} WHERE option_name = ? FOR UPDATE"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(value)
}

/// Store a new counter value. Must run in the transaction holding the lock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn store_counter(
    conn: &mut MySqlConnection,
    tables: &Tables,
    name: &str,
    value: u64,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "UPDATE {} SET option_value = ? WHERE option_name = ?",
        tables.options()
    ))
    .bind(value.to_string())
    .bind(name)
    .execute(conn)
    .await?;
    Ok(())
}

/// Delete order-count and report transients so wp-admin shows fresh numbers.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_order_transients(
    conn: &mut MySqlConnection,
    tables: &Tables,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE option_name LIKE '\\_transient\\_wc\\_%' \
         OR option_name LIKE '\\_transient\\_timeout\\_wc\\_%' \
         OR option_name LIKE '\\_transient\\_orders-transient-version%'",
        tables.options()
    ))
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
