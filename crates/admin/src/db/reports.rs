//! Sales and profit report queries.
//!
//! Only orders numbered by this back-office (`_order_number` meta present)
//! and not in the trash are counted. Dates are store-local, which is UTC-5.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use woo_backoffice_core::{OrderId, ProductId};

use super::{RepositoryError, Tables};
use crate::models::{
    CostedOrder, DailySales, ReportRange, SalesSummary, StatusCount, TopProduct, UserSales,
};

/// `wc_orders.date_created_gmt` as a store-local date.
const LOCAL_DATE: &str = "DATE(DATE_SUB(o.date_created_gmt, INTERVAL 5 HOUR))";

/// Statuses left out of the profit report.
const UNPROFITABLE: &str = "'wc-cancelled', 'wc-refunded', 'wc-failed'";

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    total_orders: i64,
    total_sales: Option<Decimal>,
    avg_order_value: Option<Decimal>,
    completed_orders: i64,
    cancelled_orders: i64,
    processing_orders: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: u64,
    product_name: String,
    quantity_sold: Option<i64>,
    times_ordered: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CostedOrderRow {
    id: u64,
    order_number: String,
    order_date: NaiveDate,
    status: String,
    total_amount: Option<Decimal>,
    cost_usd: Option<Decimal>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Repository for report aggregates.
pub struct ReportRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
}

impl<'a> ReportRepository<'a> {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self { pool, tables }
    }

    /// `FROM` and `WHERE` shared by every sales report; binds start, end.
    fn numbered_orders(&self) -> String {
        format!(
            "FROM {orders} o \
             INNER JOIN {meta} om ON om.order_id = o.id AND om.meta_key = '_order_number' \
             WHERE {LOCAL_DATE} BETWEEN ? AND ? AND o.status != 'trash'",
            orders = self.tables.wc_orders(),
            meta = self.tables.wc_orders_meta(),
        )
    }

    /// Headline figures for the period.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn summary(&self, range: ReportRange) -> Result<SalesSummary, RepositoryError> {
        let row: SummaryRow = sqlx::query_as(&format!(
            "SELECT COUNT(DISTINCT o.id) AS total_orders, \
             SUM(o.total_amount) AS total_sales, \
             AVG(o.total_amount) AS avg_order_value, \
             COUNT(DISTINCT CASE WHEN o.status = 'wc-completed' THEN o.id END) \
                 AS completed_orders, \
             COUNT(DISTINCT CASE WHEN o.status = 'wc-cancelled' THEN o.id END) \
                 AS cancelled_orders, \
             COUNT(DISTINCT CASE WHEN o.status = 'wc-processing' THEN o.id END) \
                 AS processing_orders \
             {}",
            self.numbered_orders()
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_one(self.pool)
        .await?;

        let total_discounts: Option<Decimal> = sqlx::query_scalar(&format!(
            "SELECT SUM(CAST(d.meta_value AS DECIMAL(12,2))) \
             FROM {meta} d INNER JOIN {orders} o ON o.id = d.order_id \
             WHERE d.meta_key = '_wc_discount_amount' \
             AND {LOCAL_DATE} BETWEEN ? AND ? AND o.status != 'trash'",
            meta = self.tables.wc_orders_meta(),
            orders = self.tables.wc_orders(),
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_one(self.pool)
        .await?;

        Ok(SalesSummary {
            total_orders: count(row.total_orders),
            total_sales: row.total_sales.unwrap_or_default(),
            avg_order_value: row
                .avg_order_value
                .unwrap_or_default()
                .round_dp(2),
            completed_orders: count(row.completed_orders),
            cancelled_orders: count(row.cancelled_orders),
            processing_orders: count(row.processing_orders),
            total_discounts: total_discounts.unwrap_or_default(),
        })
    }

    /// Orders and sales per local day, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_by_day(
        &self,
        range: ReportRange,
    ) -> Result<Vec<DailySales>, RepositoryError> {
        let rows: Vec<(NaiveDate, i64, Option<Decimal>)> = sqlx::query_as(&format!(
            "SELECT {LOCAL_DATE} AS day, COUNT(o.id), SUM(o.total_amount) {} \
             GROUP BY day ORDER BY day",
            self.numbered_orders()
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, orders, total)| DailySales {
                date,
                orders: count(orders),
                total: total.unwrap_or_default(),
            })
            .collect())
    }

    /// Best-selling parent products by quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(
        &self,
        range: ReportRange,
        limit: u32,
    ) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows: Vec<TopProductRow> = sqlx::query_as(&format!(
            "SELECT p.ID AS product_id, p.post_title AS product_name, \
             CAST(SUM(CAST(qty.meta_value AS SIGNED)) AS SIGNED) AS quantity_sold, \
             COUNT(DISTINCT oi.order_id) AS times_ordered \
             FROM {items} oi \
             INNER JOIN {orders} o ON o.id = oi.order_id \
             INNER JOIN {itemmeta} qty \
                 ON qty.order_item_id = oi.order_item_id AND qty.meta_key = '_qty' \
             INNER JOIN {itemmeta} pid \
                 ON pid.order_item_id = oi.order_item_id AND pid.meta_key = '_product_id' \
             INNER JOIN {posts} p ON p.ID = CAST(pid.meta_value AS UNSIGNED) \
             WHERE oi.order_item_type = 'line_item' \
             AND {LOCAL_DATE} BETWEEN ? AND ? AND o.status != 'trash' \
             GROUP BY p.ID, p.post_title ORDER BY quantity_sold DESC LIMIT ?",
            items = self.tables.order_items(),
            orders = self.tables.wc_orders(),
            itemmeta = self.tables.order_itemmeta(),
            posts = self.tables.posts(),
        ))
        .bind(range.start)
        .bind(range.end)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                product_id: ProductId::new(row.product_id),
                product_name: row.product_name,
                quantity_sold: row.quantity_sold.unwrap_or(0),
                times_ordered: count(row.times_ordered),
            })
            .collect())
    }

    /// Sales per operator (`_created_by`), best first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_by_user(
        &self,
        range: ReportRange,
    ) -> Result<Vec<UserSales>, RepositoryError> {
        let rows: Vec<(Option<String>, Option<String>, i64, Option<Decimal>)> =
            sqlx::query_as(&format!(
                "SELECT cb.meta_value AS username, MAX(u.full_name) AS full_name, \
                 COUNT(o.id) AS total_orders, SUM(o.total_amount) AS total_sales \
                 FROM {orders} o \
                 INNER JOIN {meta} om ON om.order_id = o.id AND om.meta_key = '_order_number' \
                 LEFT JOIN {meta} cb ON cb.order_id = o.id AND cb.meta_key = '_created_by' \
                 LEFT JOIN woo_users u ON u.username = cb.meta_value \
                 WHERE {LOCAL_DATE} BETWEEN ? AND ? AND o.status != 'trash' \
                 GROUP BY cb.meta_value ORDER BY total_sales DESC",
                orders = self.tables.wc_orders(),
                meta = self.tables.wc_orders_meta(),
            ))
            .bind(range.start)
            .bind(range.end)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(username, full_name, orders, total)| {
                let username = username.unwrap_or_else(|| "unknown".to_string());
                let full_name = full_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| username.clone());
                UserSales {
                    username,
                    full_name,
                    total_orders: count(orders),
                    total_sales: total.unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Order count per raw status, most common first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_distribution(
        &self,
        range: ReportRange,
    ) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT o.status, COUNT(o.id) AS n {} GROUP BY o.status ORDER BY n DESC",
            self.numbered_orders()
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, n)| StatusCount {
                status,
                count: count(n),
            })
            .collect())
    }

    /// Orders in the period with their USD cost, newest first.
    ///
    /// A line's unit cost is the sum of `FCLastCost` over the 7-character
    /// cost SKUs contained in the line's SKU (the variation's when there is
    /// one). Orders with no costable line are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn costed_orders(
        &self,
        range: ReportRange,
    ) -> Result<Vec<CostedOrder>, RepositoryError> {
        let cost = format!(
            "(SELECT SUM( \
                 (SELECT SUM(fc.FCLastCost) FROM woo_products_fccost fc \
                  WHERE LENGTH(fc.sku) = 7 \
                  AND sku.meta_value COLLATE utf8mb4_unicode_520_ci \
                      LIKE CONCAT('%', fc.sku COLLATE utf8mb4_unicode_520_ci, '%')) \
                 * CAST(qty.meta_value AS DECIMAL(12,2))) \
             FROM {items} oi \
             INNER JOIN {itemmeta} pid \
                 ON pid.order_item_id = oi.order_item_id AND pid.meta_key = '_product_id' \
             INNER JOIN {itemmeta} qty \
                 ON qty.order_item_id = oi.order_item_id AND qty.meta_key = '_qty' \
             LEFT JOIN {itemmeta} vid \
                 ON vid.order_item_id = oi.order_item_id AND vid.meta_key = '_variation_id' \
             INNER JOIN {postmeta} sku \
                 ON sku.post_id = \
                     CAST(COALESCE(NULLIF(vid.meta_value, '0'), pid.meta_value) AS UNSIGNED) \
                 AND sku.meta_key = '_sku' \
             WHERE oi.order_id = o.id AND oi.order_item_type = 'line_item')",
            items = self.tables.order_items(),
            itemmeta = self.tables.order_itemmeta(),
            postmeta = self.tables.postmeta(),
        );

        let rows: Vec<CostedOrderRow> = sqlx::query_as(&format!(
            "SELECT o.id, om.meta_value AS order_number, {LOCAL_DATE} AS order_date, o.status, \
             o.total_amount, CAST({cost} AS DECIMAL(14,4)) AS cost_usd, \
             ba.first_name, ba.last_name \
             FROM {orders} o \
             INNER JOIN {meta} om ON om.order_id = o.id AND om.meta_key = '_order_number' \
             LEFT JOIN {addresses} ba ON ba.order_id = o.id AND ba.address_type = 'billing' \
             WHERE {LOCAL_DATE} BETWEEN ? AND ? AND o.status != 'trash' \
             AND o.status NOT IN ({UNPROFITABLE}) \
             HAVING cost_usd IS NOT NULL \
             ORDER BY order_date DESC, o.id DESC",
            orders = self.tables.wc_orders(),
            meta = self.tables.wc_orders_meta(),
            addresses = self.tables.wc_order_addresses(),
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let cost_usd = row.cost_usd?;
                let customer_name = format!(
                    "{} {}",
                    row.first_name.unwrap_or_default().trim(),
                    row.last_name.unwrap_or_default().trim()
                )
                .trim()
                .to_string();
                Some(CostedOrder {
                    id: OrderId::new(row.id),
                    order_number: row.order_number,
                    date: row.order_date,
                    status: row.status,
                    total_pen: row.total_amount.unwrap_or_default(),
                    cost_usd,
                    customer_name,
                })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_numbered_orders_uses_prefix() {
        let tables = Tables::new("wpyz_").unwrap();
        let pool = MySqlPool::connect_lazy("mysql://u:p@localhost/db").unwrap();
        let sql = ReportRepository::new(&pool, &tables).numbered_orders();
        assert!(sql.starts_with("FROM wpyz_wc_orders o INNER JOIN wpyz_wc_orders_meta om"));
        assert!(sql.contains("o.status != 'trash'"));
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        assert_eq!(count(-1), 0);
        assert_eq!(count(42), 42);
    }
}
