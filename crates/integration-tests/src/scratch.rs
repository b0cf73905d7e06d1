//! Throwaway copies of the store tables for database tests.
//!
//! Needs a MySQL database with WordPress and WooCommerce installed and
//! `wbo-cli migrate` applied:
//!
//! - `TEST_DATABASE_URL` - connection string
//! - `TEST_TABLE_PREFIX` - prefix of the installed tables (default `wp_`)
//!
//! Every table the back-office touches is cloned with `CREATE TABLE ...
//! LIKE` under a random prefix, so the installed store is never written.

use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use woo_backoffice_admin::db::{Tables, schema};
use woo_backoffice_core::{OrderId, ProductId};

/// WordPress and WooCommerce tables cloned for each test.
const STORE_TABLES: [&str; 9] = [
    "posts",
    "postmeta",
    "options",
    "wc_orders",
    "wc_order_addresses",
    "wc_order_operational_data",
    "wc_orders_meta",
    "woocommerce_order_items",
    "woocommerce_order_itemmeta",
];

/// A pool plus a private set of store tables.
pub struct ScratchStore {
    pub pool: MySqlPool,
    pub tables: Tables,
}

impl ScratchStore {
    /// Connect and clone the store tables under a fresh prefix.
    ///
    /// # Panics
    ///
    /// Panics if `TEST_DATABASE_URL` is unset or any statement fails.
    #[allow(clippy::unwrap_used)]
    pub async fn create() -> Self {
        let url = std::env::var("TEST_DATABASE_URL").unwrap();
        let source = std::env::var("TEST_TABLE_PREFIX").unwrap_or_else(|_| "wp_".to_string());
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();

        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(8)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let tables = Tables::new(&format!("wbo_t{suffix}_")).unwrap();

        for name in STORE_TABLES {
            sqlx::query(&format!("CREATE TABLE {}{name} LIKE {source}{name}", tables.prefix()))
                .execute(&pool)
                .await
                .unwrap();
        }
        schema::ensure_history_tables(&pool, &tables).await.unwrap();

        Self { pool, tables }
    }

    /// Insert a published post with the given ID and type.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    #[allow(clippy::unwrap_used)]
    pub async fn insert_post(&self, id: u64, post_type: &str, title: &str) {
        sqlx::query(&format!(
            "INSERT INTO {} (ID, post_author, post_date, post_date_gmt, post_content, post_title, \
             post_excerpt, post_status, comment_status, ping_status, post_password, post_name, \
             to_ping, pinged, post_modified, post_modified_gmt, post_content_filtered, \
             post_parent, guid, menu_order, post_type, post_mime_type, comment_count) \
             VALUES (?, 1, NOW(), UTC_TIMESTAMP(), '', ?, '', 'publish', 'closed', 'closed', '', \
             ?, '', '', NOW(), UTC_TIMESTAMP(), '', 0, '', 0, ?, '', 0)",
            self.tables.posts()
        ))
        .bind(id)
        .bind(title)
        .bind(format!("post-{id}"))
        .bind(post_type)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    /// Insert a simple product with a price, SKU and managed stock.
    ///
    /// # Panics
    ///
    /// Panics if an insert fails.
    #[allow(clippy::unwrap_used)]
    pub async fn insert_product(&self, id: u64, price: &str, stock: i64) -> ProductId {
        self.insert_post(id, "product", "Polo básico").await;
        let stock = stock.to_string();
        for (key, value) in [
            ("_sku", "POL0001"),
            ("_regular_price", price),
            ("_price", price),
            ("_manage_stock", "yes"),
            ("_stock", stock.as_str()),
            ("_stock_status", "instock"),
        ] {
            sqlx::query(&format!(
                "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
                self.tables.postmeta()
            ))
            .bind(id)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .unwrap();
        }
        ProductId::new(id)
    }

    /// `(meta_key, meta_value)` rows of an order in both storages:
    /// `wc_orders_meta` first, then the shadow post's `postmeta`.
    ///
    /// # Panics
    ///
    /// Panics if a query fails.
    #[allow(clippy::unwrap_used)]
    pub async fn order_meta(&self, id: OrderId) -> (Vec<(String, String)>, Vec<(String, String)>) {
        let hpos: Vec<(String, String)> = sqlx::query_as(&format!(
            "SELECT meta_key, meta_value FROM {} WHERE order_id = ? ORDER BY id",
            self.tables.wc_orders_meta()
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .unwrap();
        let legacy: Vec<(String, String)> = sqlx::query_as(&format!(
            "SELECT meta_key, meta_value FROM {} WHERE post_id = ? ORDER BY meta_id",
            self.tables.postmeta()
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .unwrap();
        (hpos, legacy)
    }

    /// Current `_stock` of a product.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    #[allow(clippy::unwrap_used)]
    pub async fn stock_of(&self, id: ProductId) -> Option<String> {
        sqlx::query_scalar(&format!(
            "SELECT meta_value FROM {} WHERE post_id = ? AND meta_key = '_stock'",
            self.tables.postmeta()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap()
    }

    /// Drop every scratch table and the outbox rows of `orders`.
    ///
    /// # Panics
    ///
    /// Panics if a statement fails.
    #[allow(clippy::unwrap_used)]
    pub async fn teardown(self, orders: &[OrderId]) {
        for id in orders {
            sqlx::query("DELETE FROM woo_email_outbox WHERE order_id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .unwrap();
        }
        let names = STORE_TABLES
            .iter()
            .map(|name| format!("{}{name}", self.tables.prefix()))
            .chain([self.tables.stock_history(), self.tables.price_history()]);
        for table in names {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&self.pool)
                .await
                .unwrap();
        }
        self.pool.close().await;
    }
}
