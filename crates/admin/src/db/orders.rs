//! Order storage: HPOS tables, the legacy shadow post, and order items.
//!
//! Reads go to the HPOS tables. Writes are free functions over a single
//! connection so the whole order is written inside one transaction.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{MySqlConnection, MySqlPool};

use woo_backoffice_core::{OrderId, OrderItemId, OrderStatus, PageRequest};

use super::{Filter, RepositoryError, Tables, placeholders};
use crate::models::{Address, AddressType, OrderDetail, OrderItemView, OrderRecord, OrderSummary};

/// Filters for the order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Matches order id, billing e-mail, first or last name, or phone.
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: u64,
    status: Option<String>,
    currency: Option<String>,
    total_amount: Option<Decimal>,
    billing_email: Option<String>,
    date_created_gmt: Option<NaiveDateTime>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    order_number: Option<String>,
    created_by: Option<String>,
    order_source: Option<String>,
}

impl From<SummaryRow> for OrderSummary {
    fn from(row: SummaryRow) -> Self {
        let customer_name = format!(
            "{} {}",
            row.first_name.as_deref().unwrap_or_default().trim(),
            row.last_name.as_deref().unwrap_or_default().trim()
        )
        .trim()
        .to_string();

        Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            status: display_status(row.status.as_deref()),
            currency: row.currency,
            total: row.total_amount,
            customer_name,
            customer_email: row.billing_email,
            customer_phone: row.phone,
            created_by: row.created_by,
            source: row.order_source,
            date_created: row.date_created_gmt,
        }
    }
}

/// `wc-processing` → `processing`; unknown statuses pass through.
fn display_status(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    raw.parse::<OrderStatus>()
        .map_or_else(|_| raw.to_string(), |s| s.as_api_str().to_string())
}

#[derive(Debug, sqlx::FromRow)]
struct HeaderRow {
    id: u64,
    status: Option<String>,
    currency: Option<String>,
    total_amount: Option<Decimal>,
    tax_amount: Option<Decimal>,
    payment_method: Option<String>,
    payment_method_title: Option<String>,
    customer_note: Option<String>,
    date_created_gmt: Option<NaiveDateTime>,
    date_updated_gmt: Option<NaiveDateTime>,
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    address_type: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            company: row.company.unwrap_or_default(),
            address_1: row.address_1.unwrap_or_default(),
            address_2: row.address_2.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            state: row.state.unwrap_or_default(),
            postcode: row.postcode.unwrap_or_default(),
            country: row.country.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
        }
    }
}

/// Repository for order reads and the collision-guard statements.
pub struct OrderRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self { pool, tables }
    }

    /// Orders newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<OrderSummary>, u64), RepositoryError> {
        let orders = self.tables.wc_orders();
        let addresses = self.tables.wc_order_addresses();
        let meta = self.tables.wc_orders_meta();

        let mut conditions = Filter::new();
        conditions.raw("o.type = 'shop_order'");
        if let Some(status) = filter.status {
            conditions.eq_text("o.status", status.as_db_str());
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.search(
                &[
                    "CAST(o.id AS CHAR)",
                    "o.billing_email",
                    "a.first_name",
                    "a.last_name",
                    "a.phone",
                ],
                term,
            );
        }
        let clause = conditions.where_clause();
        let from = format!(
            "FROM {orders} o LEFT JOIN {addresses} a \
             ON a.order_id = o.id AND a.address_type = 'billing'"
        );

        let total: i64 = conditions
            .bind_scalar(sqlx::query_scalar(&format!("SELECT COUNT(*) {from}{clause}")))
            .fetch_one(self.pool)
            .await?;

        let meta_value = |key: &str| {
            format!(
                "(SELECT m.meta_value FROM {meta} m WHERE m.order_id = o.id \
                 AND m.meta_key = '{key}' ORDER BY m.id LIMIT 1)"
            )
        };
        let sql = format!(
            "SELECT o.id, o.status, o.currency, o.total_amount, o.billing_email, \
             o.date_created_gmt, a.first_name, a.last_name, a.phone, \
             {number} AS order_number, {created_by} AS created_by, {source} AS order_source \
             {from}{clause} ORDER BY o.date_created_gmt DESC, o.id DESC LIMIT ? OFFSET ?",
            number = meta_value("_order_number"),
            created_by = meta_value("_created_by"),
            source = meta_value("_order_source"),
        );
        let rows: Vec<SummaryRow> = conditions
            .bind_as(sqlx::query_as(&sql))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// Full order with addresses, items and meta.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let header: Option<HeaderRow> = sqlx::query_as(&format!(
            "SELECT id, status, currency, total_amount, tax_amount, payment_method, \
             payment_method_title, customer_note, date_created_gmt, date_updated_gmt \
             FROM {} WHERE id = ?",
            self.tables.wc_orders()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        let Some(header) = header else {
            return Ok(None);
        };

        let addresses: Vec<AddressRow> = sqlx::query_as(&format!(
            "SELECT address_type, first_name, last_name, company, address_1, address_2, city, \
             state, postcode, country, email, phone FROM {} WHERE order_id = ? ORDER BY id",
            self.tables.wc_order_addresses()
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        let mut billing = None;
        let mut shipping = None;
        for row in addresses {
            match row.address_type.as_deref() {
                Some("billing") if billing.is_none() => billing = Some(row.into()),
                Some("shipping") if shipping.is_none() => shipping = Some(row.into()),
                _ => {}
            }
        }

        let items = self.items(id).await?;

        let meta_rows: Vec<(Option<String>, Option<String>)> = sqlx::query_as(&format!(
            "SELECT meta_key, meta_value FROM {} WHERE order_id = ? ORDER BY id",
            self.tables.wc_orders_meta()
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        let mut meta = BTreeMap::new();
        for (key, value) in meta_rows {
            if let Some(key) = key {
                meta.entry(key).or_insert_with(|| value.unwrap_or_default());
            }
        }

        Ok(Some(OrderDetail {
            id: OrderId::new(header.id),
            status: display_status(header.status.as_deref()),
            currency: header.currency,
            total: header.total_amount,
            tax: header.tax_amount,
            payment_method: header.payment_method,
            payment_method_title: header.payment_method_title,
            customer_note: header.customer_note,
            date_created: header.date_created_gmt,
            date_updated: header.date_updated_gmt,
            billing,
            shipping,
            items,
            meta,
        }))
    }

    async fn items(&self, id: OrderId) -> Result<Vec<OrderItemView>, RepositoryError> {
        let rows: Vec<(u64, String, String)> = sqlx::query_as(&format!(
            "SELECT order_item_id, order_item_name, order_item_type FROM {} \
             WHERE order_id = ? ORDER BY order_item_id",
            self.tables.order_items()
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT order_item_id, meta_key, meta_value FROM {} \
             WHERE order_item_id IN ({}) ORDER BY meta_id",
            self.tables.order_itemmeta(),
            placeholders(rows.len())
        );
        let mut query = sqlx::query_as::<_, (u64, Option<String>, Option<String>)>(&sql);
        for (item_id, _, _) in &rows {
            query = query.bind(*item_id);
        }
        let meta_rows = query.fetch_all(self.pool).await?;

        let mut metas: BTreeMap<u64, BTreeMap<String, String>> = BTreeMap::new();
        for (item_id, key, value) in meta_rows {
            if let Some(key) = key {
                metas
                    .entry(item_id)
                    .or_default()
                    .entry(key)
                    .or_insert_with(|| value.unwrap_or_default());
            }
        }

        Ok(rows
            .into_iter()
            .map(|(item_id, name, item_type)| OrderItemView {
                id: OrderItemId::new(item_id),
                name,
                item_type,
                meta: metas.remove(&item_id).unwrap_or_default(),
            })
            .collect())
    }

    /// Highest ID used by either `posts` or `wc_orders`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn highest_shared_id(&self) -> Result<Option<u64>, RepositoryError> {
        let posts: Option<u64> =
            sqlx::query_scalar(&format!("SELECT MAX(ID) FROM {}", self.tables.posts()))
                .fetch_one(self.pool)
                .await?;
        let orders: Option<u64> =
            sqlx::query_scalar(&format!("SELECT MAX(id) FROM {}", self.tables.wc_orders()))
                .fetch_one(self.pool)
                .await?;
        Ok(posts.max(orders))
    }

    /// Current `AUTO_INCREMENT` of `wc_orders`, read with fresh statistics.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the table has no counter.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_auto_increment(&self) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        // MySQL 8 caches table statistics for a day by default.
        if let Err(e) = sqlx::query("SET SESSION information_schema_stats_expiry = 0")
            .execute(&mut *conn)
            .await
        {
            tracing::debug!(error = %e, "information_schema_stats_expiry not supported");
        }

        let counter: Option<Option<u64>> = sqlx::query_scalar(
            "SELECT AUTO_INCREMENT FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(self.tables.wc_orders())
        .fetch_optional(&mut *conn)
        .await?;

        counter.flatten().ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "{} has no AUTO_INCREMENT counter",
                self.tables.wc_orders()
            ))
        })
    }

    /// Raise the `wc_orders` counter. `ALTER TABLE` commits implicitly, so
    /// this must never run inside the order transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn set_orders_auto_increment(&self, value: u64) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "ALTER TABLE {} AUTO_INCREMENT = {value}",
            self.tables.wc_orders()
        ))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Writes (inside the order transaction)
// =============================================================================

/// Insert the `wc_orders` header and return the new order ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_header(
    conn: &mut MySqlConnection,
    tables: &Tables,
    record: &OrderRecord,
) -> Result<OrderId, RepositoryError> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (status, currency, type, tax_amount, total_amount, customer_id, \
         billing_email, date_created_gmt, date_updated_gmt, parent_order_id, payment_method, \
         payment_method_title, transaction_id, ip_address, user_agent, customer_note) \
         VALUES (?, ?, 'shop_order', ?, ?, 0, ?, ?, ?, 0, ?, ?, '', ?, ?, ?)",
        tables.wc_orders()
    ))
    .bind(record.status.as_db_str())
    .bind(&record.currency)
    .bind(record.totals.tax)
    .bind(record.totals.total)
    .bind(non_empty(&record.billing.email))
    .bind(record.created_at_gmt)
    .bind(record.created_at_gmt)
    .bind(&record.payment_method)
    .bind(&record.payment_method_title)
    .bind(record.ip_address.as_deref())
    .bind(record.user_agent.as_deref())
    .bind(&record.customer_note)
    .execute(conn)
    .await?;
    Ok(OrderId::new(result.last_insert_id()))
}

/// Insert the legacy `shop_order` post that shares the order's ID.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a post already uses the ID.
/// Returns `RepositoryError::Database` if the insert fails otherwise.
pub async fn insert_shadow_post(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    record: &OrderRecord,
) -> Result<(), RepositoryError> {
    let local = record.created_at_local;
    let title = format!("Order &ndash; {}", local.format("%B %-d, %Y @ %I:%M %p"));
    let slug = format!("order-{}", local.format("%b-%d-%Y-%I%M-%p").to_string().to_lowercase());

    sqlx::query(&format!(
        "INSERT INTO {} (ID, post_author, post_date, post_date_gmt, post_content, post_title, \
         post_excerpt, post_status, comment_status, ping_status, post_password, post_name, \
         to_ping, pinged, post_modified, post_modified_gmt, post_content_filtered, post_parent, \
         guid, menu_order, post_type, post_mime_type, comment_count) \
         VALUES (?, 1, ?, ?, '', ?, ?, ?, 'closed', 'closed', ?, ?, '', '', ?, ?, '', 0, '', 0, \
         'shop_order', '', 0)",
        tables.posts()
    ))
    .bind(id)
    .bind(local)
    .bind(record.created_at_gmt)
    .bind(title)
    .bind(&record.customer_note)
    .bind(record.status.as_db_str())
    .bind(&record.order_key)
    .bind(slug)
    .bind(local)
    .bind(record.created_at_gmt)
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::from_insert(e, "post with this order ID"))?;
    Ok(())
}

/// Insert one `wc_order_addresses` row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_address(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    kind: AddressType,
    address: &Address,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!(
        "INSERT INTO {} (order_id, address_type, first_name, last_name, company, address_1, \
         address_2, city, state, postcode, country, email, phone) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        tables.wc_order_addresses()
    ))
    .bind(id)
    .bind(kind.as_str())
    .bind(&address.first_name)
    .bind(&address.last_name)
    .bind(&address.company)
    .bind(&address.address_1)
    .bind(&address.address_2)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postcode)
    .bind(&address.country)
    .bind(non_empty(&address.email))
    .bind(&address.phone)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert the `wc_order_operational_data` row.
///
/// Stock is flagged as already reduced so WooCommerce does not reduce it a
/// second time when the order moves to processing.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_operational_data(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    record: &OrderRecord,
    woocommerce_version: &str,
) -> Result<(), RepositoryError> {
    let shipping = record.shipping_amounts;
    let discount = record.discount_amounts;
    sqlx::query(&format!(
        "INSERT INTO {} (order_id, created_via, woocommerce_version, prices_include_tax, \
         coupon_usages_are_counted, download_permission_granted, cart_hash, \
         new_order_email_sent, order_key, order_stock_reduced, date_paid_gmt, \
         date_completed_gmt, shipping_tax_amount, shipping_total_amount, discount_tax_amount, \
         discount_total_amount, recorded_sales) \
         VALUES (?, 'backoffice', ?, 1, 0, 0, '', 0, ?, 1, NULL, NULL, ?, ?, ?, ?, 0)",
        tables.wc_order_operational_data()
    ))
    .bind(id)
    .bind(woocommerce_version)
    .bind(&record.order_key)
    .bind(shipping.tax)
    .bind(shipping.net)
    .bind(Decimal::ZERO - discount.tax)
    .bind(Decimal::ZERO - discount.net)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert key/value rows into a meta table in one statement.
async fn insert_meta_rows(
    conn: &mut MySqlConnection,
    table: &str,
    owner_column: &str,
    owner_id: u64,
    rows: &[(String, String)],
) -> Result<(), RepositoryError> {
    if rows.is_empty() {
        return Ok(());
    }
    let values = vec!["(?, ?, ?)"; rows.len()].join(", ");
    let sql = format!("INSERT INTO {table} ({owner_column}, meta_key, meta_value) VALUES {values}");
    let mut query = sqlx::query(&sql);
    for (key, value) in rows {
        query = query.bind(owner_id).bind(key).bind(value);
    }
    query.execute(conn).await?;
    Ok(())
}

/// Write order meta to `wc_orders_meta`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order_meta(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    rows: &[(String, String)],
) -> Result<(), RepositoryError> {
    insert_meta_rows(conn, &tables.wc_orders_meta(), "order_id", id.as_u64(), rows).await
}

/// Write order meta to the shadow post's `postmeta`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_legacy_meta(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    rows: &[(String, String)],
) -> Result<(), RepositoryError> {
    insert_meta_rows(conn, &tables.postmeta(), "post_id", id.as_u64(), rows).await
}

/// Insert an order item and its meta.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_item(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: OrderId,
    name: &str,
    item_type: &str,
    meta: &[(String, String)],
) -> Result<OrderItemId, RepositoryError> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (order_item_name, order_item_type, order_id) VALUES (?, ?, ?)",
        tables.order_items()
    ))
    .bind(name)
    .bind(item_type)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    let item_id = OrderItemId::new(result.last_insert_id());

    insert_meta_rows(
        conn,
        &tables.order_itemmeta(),
        "order_item_id",
        item_id.as_u64(),
        meta,
    )
    .await?;
    Ok(item_id)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_status_strips_prefix() {
        assert_eq!(display_status(Some("wc-processing")), "processing");
        assert_eq!(display_status(Some("trash")), "trash");
        assert_eq!(display_status(Some("wc-custom")), "wc-custom");
        assert_eq!(display_status(None), "");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" a@b.pe "), Some("a@b.pe"));
    }
}
