//! Prefixed auxiliary tables.
//!
//! The stock and price audit tables live next to the WordPress tables and
//! carry the same prefix, which static migration files cannot know. They
//! are created here, idempotently, by `wbo-cli migrate`.

use sqlx::MySqlPool;

use super::{RepositoryError, Tables};

fn stock_history_ddl(tables: &Tables) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            product_id BIGINT UNSIGNED NOT NULL,
            product_title VARCHAR(255),
            sku VARCHAR(100),
            old_stock INT,
            new_stock INT,
            change_amount INT,
            changed_by VARCHAR(100) NOT NULL,
            change_reason VARCHAR(255),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            INDEX idx_stock_history_product (product_id, created_at),
            INDEX idx_stock_history_created (created_at)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        tables.stock_history()
    )
}

fn price_history_ddl(tables: &Tables) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            product_id BIGINT UNSIGNED NOT NULL,
            product_title VARCHAR(255),
            sku VARCHAR(100),
            old_regular_price DECIMAL(12, 2),
            new_regular_price DECIMAL(12, 2),
            old_sale_price DECIMAL(12, 2),
            new_sale_price DECIMAL(12, 2),
            old_price DECIMAL(12, 2),
            new_price DECIMAL(12, 2),
            changed_by VARCHAR(100) NOT NULL,
            change_reason VARCHAR(255),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            INDEX idx_price_history_product (product_id, created_at),
            INDEX idx_price_history_created (created_at)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        tables.price_history()
    )
}

/// Create the prefixed history tables if they are missing.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn ensure_history_tables(
    pool: &MySqlPool,
    tables: &Tables,
) -> Result<(), RepositoryError> {
    sqlx::query(&stock_history_ddl(tables)).execute(pool).await?;
    sqlx::query(&price_history_ddl(tables)).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_uses_prefix() {
        let tables = Tables::new("wpyz_").unwrap();
        assert!(stock_history_ddl(&tables).contains("EXISTS wpyz_stock_history ("));
        assert!(price_history_ddl(&tables).contains("EXISTS wpyz_price_history ("));
    }
}
