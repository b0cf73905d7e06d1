//! Append-only stock and price audit logs.
//!
//! Rows are only ever inserted. Inserts take a plain connection so the order
//! flow can write them inside its transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{MySqlConnection, MySqlPool};

use woo_backoffice_core::{PageRequest, PriceHistoryId, ProductId, StockHistoryId};

use super::{Filter, RepositoryError, Tables};
use crate::models::{NewPriceHistory, NewStockHistory, PriceHistoryEntry, StockHistoryEntry};

/// Filters shared by both history lists.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Matches SKU, product title or the operator name.
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive through the end of the day.
    pub date_to: Option<NaiveDate>,
    pub product_id: Option<ProductId>,
}

impl HistoryFilter {
    fn conditions(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(term) = self.search.as_deref().filter(|s| !s.is_empty()) {
            filter.search(&["sku", "product_title", "changed_by"], term);
        }
        if let Some(from) = self.date_from.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            filter.since("created_at", from);
        }
        if let Some(to) = self.date_to.and_then(|d| d.and_hms_opt(23, 59, 59)) {
            filter.until("created_at", to);
        }
        if let Some(id) = self.product_id {
            filter.eq_uint("product_id", id.as_u64());
        }
        filter
    }
}

// =============================================================================
// Stock history
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StockHistoryRow {
    id: u64,
    product_id: u64,
    product_title: Option<String>,
    sku: Option<String>,
    old_stock: Option<i32>,
    new_stock: Option<i32>,
    change_amount: Option<i32>,
    changed_by: String,
    change_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<StockHistoryRow> for StockHistoryEntry {
    fn from(row: StockHistoryRow) -> Self {
        Self {
            id: StockHistoryId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_title: row.product_title,
            sku: row.sku,
            old_stock: row.old_stock.map(i64::from),
            new_stock: row.new_stock.map(i64::from),
            change_amount: row.change_amount.map(i64::from),
            changed_by: row.changed_by,
            change_reason: row.change_reason,
            created_at: row.created_at,
        }
    }
}

const STOCK_COLUMNS: &str = "id, product_id, product_title, sku, old_stock, new_stock, \
                             change_amount, changed_by, change_reason, created_at";

/// Append a stock history row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_stock(
    conn: &mut MySqlConnection,
    tables: &Tables,
    entry: &NewStockHistory<'_>,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO {} (product_id, product_title, sku, old_stock, new_stock, change_amount, \
         changed_by, change_reason) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        tables.stock_history()
    ))
    .bind(entry.product_id)
    .bind(entry.product_title)
    .bind(entry.sku)
    .bind(entry.old_stock)
    .bind(entry.new_stock)
    .bind(entry.change_amount())
    .bind(entry.changed_by)
    .bind(entry.reason)
    .execute(conn)
    .await?;
    Ok(())
}

/// Repository for `{prefix}stock_history`.
pub struct StockHistoryRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
}

impl<'a> StockHistoryRepository<'a> {
    /// Create a new stock history repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self { pool, tables }
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, entry: &NewStockHistory<'_>) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_stock(&mut conn, self.tables, entry).await
    }

    /// Latest rows for one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockHistoryEntry>, RepositoryError> {
        let rows: Vec<StockHistoryRow> = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM {} WHERE product_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            self.tables.stock_history()
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Filtered page, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<(Vec<StockHistoryEntry>, u64), RepositoryError> {
        let table = self.tables.stock_history();
        let conditions = filter.conditions();
        let clause = conditions.where_clause();

        let total: i64 = conditions
            .bind_scalar(sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table}{clause}"
            )))
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<StockHistoryRow> = conditions
            .bind_as(sqlx::query_as(&format!(
                "SELECT {STOCK_COLUMNS} FROM {table}{clause} \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            )))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }
}

// =============================================================================
// Price history
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PriceHistoryRow {
    id: u64,
    product_id: u64,
    product_title: Option<String>,
    sku: Option<String>,
    old_regular_price: Option<Decimal>,
    new_regular_price: Option<Decimal>,
    old_sale_price: Option<Decimal>,
    new_sale_price: Option<Decimal>,
    old_price: Option<Decimal>,
    new_price: Option<Decimal>,
    changed_by: String,
    change_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PriceHistoryRow> for PriceHistoryEntry {
    fn from(row: PriceHistoryRow) -> Self {
        Self {
            id: PriceHistoryId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_title: row.product_title,
            sku: row.sku,
            old_regular_price: row.old_regular_price,
            new_regular_price: row.new_regular_price,
            old_sale_price: row.old_sale_price,
            new_sale_price: row.new_sale_price,
            old_price: row.old_price,
            new_price: row.new_price,
            changed_by: row.changed_by,
            change_reason: row.change_reason,
            created_at: row.created_at,
        }
    }
}

const PRICE_COLUMNS: &str = "id, product_id, product_title, sku, old_regular_price, \
                             new_regular_price, old_sale_price, new_sale_price, old_price, \
                             new_price, changed_by, change_reason, created_at";

/// Repository for `{prefix}price_history`.
pub struct PriceHistoryRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
}

impl<'a> PriceHistoryRepository<'a> {
    /// Create a new price history repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self { pool, tables }
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, entry: &NewPriceHistory<'_>) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO {} (product_id, product_title, sku, old_regular_price, \
             new_regular_price, old_sale_price, new_sale_price, old_price, new_price, \
             changed_by, change_reason) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.tables.price_history()
        ))
        .bind(entry.product_id)
        .bind(entry.product_title)
        .bind(entry.sku)
        .bind(entry.old.regular)
        .bind(entry.new.regular)
        .bind(entry.old.sale)
        .bind(entry.new.sale)
        .bind(entry.old.active)
        .bind(entry.new.active)
        .bind(entry.changed_by)
        .bind(entry.reason)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Latest rows for one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<PriceHistoryEntry>, RepositoryError> {
        let rows: Vec<PriceHistoryRow> = sqlx::query_as(&format!(
            "SELECT {PRICE_COLUMNS} FROM {} WHERE product_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            self.tables.price_history()
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Filtered page, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<(Vec<PriceHistoryEntry>, u64), RepositoryError> {
        let table = self.tables.price_history();
        let conditions = filter.conditions();
        let clause = conditions.where_clause();

        let total: i64 = conditions
            .bind_scalar(sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table}{clause}"
            )))
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<PriceHistoryRow> = conditions
            .bind_as(sqlx::query_as(&format!(
                "SELECT {PRICE_COLUMNS} FROM {table}{clause} \
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            )))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_date_range_is_inclusive() {
        let filter = HistoryFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 5, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 5, 31),
            ..HistoryFilter::default()
        };
        assert_eq!(
            filter.conditions().where_clause(),
            " WHERE created_at >= ? AND created_at <= ?"
        );
    }

    #[test]
    fn test_filter_empty_search_is_ignored() {
        let filter = HistoryFilter {
            search: Some(String::new()),
            ..HistoryFilter::default()
        };
        assert!(filter.conditions().is_empty());
    }
}
