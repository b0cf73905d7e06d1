//! Catalog queries over `posts`/`postmeta`.
//!
//! Products are `product` posts, variations are `product_variation` posts
//! whose `post_parent` is the variable product. Everything else (SKU,
//! prices, stock, image) is postmeta, read with one correlated subquery per
//! key so a missing key is simply `NULL`.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use sqlx::{MySqlConnection, MySqlPool};

use woo_backoffice_core::stock::parse_stock;
use woo_backoffice_core::{PageRequest, PostId, ProductId, StockStatus};

use super::{Filter, RepositoryError, Tables, like_pattern, meta, placeholders};
use crate::models::{
    PostHeader, ProductDetail, ProductListing, ProductSearchHit, ProductStats, ProductType,
    SearchMode, VariationView,
};

/// Stock filter for `/stock/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockFilter {
    #[default]
    All,
    InStock,
    OutOfStock,
    /// `0 < stock <= threshold`
    Low(i64),
}

impl StockFilter {
    /// Parse the query parameter pair. Unknown values mean `All`.
    #[must_use]
    pub fn from_query(filter: Option<&str>, low_threshold: i64) -> Self {
        match filter.unwrap_or("all") {
            "instock" => Self::InStock,
            "outofstock" => Self::OutOfStock,
            "low" => Self::Low(low_threshold),
            _ => Self::All,
        }
    }
}

/// Published sellable products by sale state.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PriceStats {
    pub total: i64,
    pub with_sale: i64,
    pub without_sale: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: u64,
    parent_id: u64,
    parent_title: Option<String>,
    title: String,
    status: String,
    post_type: String,
    date: Option<NaiveDateTime>,
    sku: Option<String>,
    regular_price: Option<String>,
    sale_price: Option<String>,
    price: Option<String>,
    stock: Option<String>,
    stock_status: Option<String>,
    manage_stock: Option<String>,
    variations_count: i64,
    image_file: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct HeaderRow {
    id: u64,
    parent_id: u64,
    title: String,
    status: String,
    post_type: String,
}

impl From<HeaderRow> for PostHeader {
    fn from(row: HeaderRow) -> Self {
        Self {
            id: PostId::new(row.id),
            parent_id: PostId::new(row.parent_id),
            title: row.title,
            status: row.status,
            post_type: row.post_type,
        }
    }
}

/// A meta value read as a decimal amount. Blank or malformed values are `None`.
#[must_use]
pub fn decimal_meta(raw: Option<&str>) -> Option<Decimal> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Decimal::from_str(s).ok())
}

fn stock_meta(raw: Option<&str>) -> Option<i64> {
    raw.and_then(parse_stock)
}

fn status_meta(raw: Option<&str>) -> Option<StockStatus> {
    raw.and_then(|s| s.parse::<StockStatus>().ok())
}

/// Correlated subquery reading one meta key of the post aliased `alias`.
fn meta_expr(postmeta: &str, alias: &str, key: &str) -> String {
    format!(
        "(SELECT meta_value FROM {postmeta} WHERE post_id = {alias}.ID AND meta_key = '{key}' \
         ORDER BY meta_id LIMIT 1)"
    )
}

/// Attachment path of the featured image of the post aliased `alias`.
fn image_expr(postmeta: &str, alias: &str) -> String {
    format!(
        "(SELECT af.meta_value FROM {postmeta} th \
         JOIN {postmeta} af ON af.post_id = CAST(th.meta_value AS UNSIGNED) \
         AND af.meta_key = '_wp_attached_file' \
         WHERE th.post_id = {alias}.ID AND th.meta_key = '_thumbnail_id' AND th.meta_value <> '' \
         ORDER BY th.meta_id LIMIT 1)"
    )
}

/// Repository for catalog reads and product meta writes.
pub struct ProductRepository<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
    uploads_base: &'a str,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository. `uploads_base` prefixes attachment
    /// paths to build image URLs.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables, uploads_base: &'a str) -> Self {
        Self {
            pool,
            tables,
            uploads_base,
        }
    }

    fn image_url(&self, file: Option<String>) -> Option<String> {
        file.filter(|f| !f.is_empty())
            .map(|f| format!("{}{}", self.uploads_base, f.trim_start_matches('/')))
    }

    /// `SELECT ... FROM posts p LEFT JOIN posts parent` shared by listings.
    fn listing_select(&self) -> String {
        let posts = self.tables.posts();
        let pm = self.tables.postmeta();
        format!(
            "SELECT p.ID AS id, p.post_parent AS parent_id, parent.post_title AS parent_title, \
             p.post_title AS title, p.post_status AS status, p.post_type AS post_type, \
             p.post_date AS date, \
             {sku} AS sku, {regular} AS regular_price, {sale} AS sale_price, {price} AS price, \
             {stock} AS stock, {stock_status} AS stock_status, {manage} AS manage_stock, \
             (SELECT COUNT(*) FROM {posts} c WHERE c.post_parent = p.ID \
              AND c.post_type = 'product_variation') AS variations_count, \
             COALESCE({own_image}, {parent_image}) AS image_file \
             FROM {posts} p \
             LEFT JOIN {posts} parent ON parent.ID = p.post_parent AND p.post_parent <> 0",
            sku = meta_expr(&pm, "p", "_sku"),
            regular = meta_expr(&pm, "p", "_regular_price"),
            sale = meta_expr(&pm, "p", "_sale_price"),
            price = meta_expr(&pm, "p", "_price"),
            stock = meta_expr(&pm, "p", "_stock"),
            stock_status = meta_expr(&pm, "p", "_stock_status"),
            manage = meta_expr(&pm, "p", "_manage_stock"),
            own_image = image_expr(&pm, "p"),
            parent_image = image_expr(&pm, "parent"),
        )
    }

    fn listing(&self, row: ListingRow) -> ProductListing {
        ProductListing {
            id: ProductId::new(row.id),
            parent_id: (row.parent_id != 0).then(|| ProductId::new(row.parent_id)),
            parent_title: row.parent_title,
            product_type: ProductType::classify(&row.post_type, row.variations_count),
            title: row.title,
            status: row.status,
            sku: row.sku.filter(|s| !s.is_empty()),
            regular_price: decimal_meta(row.regular_price.as_deref()),
            sale_price: decimal_meta(row.sale_price.as_deref()),
            price: decimal_meta(row.price.as_deref()),
            stock: stock_meta(row.stock.as_deref()),
            stock_status: status_meta(row.stock_status.as_deref()),
            manage_stock: row.manage_stock.as_deref() == Some("yes"),
            variations_count: row.variations_count,
            image_url: self.image_url(row.image_file),
            date: row.date,
        }
    }

    async fn page(
        &self,
        filter: &Filter,
        order_by: &str,
        page: PageRequest,
    ) -> Result<(Vec<ProductListing>, u64), RepositoryError> {
        let posts = self.tables.posts();
        let clause = filter.where_clause();

        let total: i64 = filter
            .bind_scalar(sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {posts} p{clause}"
            )))
            .fetch_one(self.pool)
            .await?;

        let sql = format!(
            "{}{clause} ORDER BY {order_by} LIMIT ? OFFSET ?",
            self.listing_select()
        );
        let rows: Vec<ListingRow> = filter
            .bind_as(sqlx::query_as(&sql))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(|r| self.listing(r)).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// `(title LIKE ? OR ID LIKE ? OR sku LIKE ? [OR parent LIKE ?])`
    fn sellable_search(&self, filter: &mut Filter, term: &str, include_parent: bool) {
        let pm = self.tables.postmeta();
        let pattern = like_pattern(term);
        let mut condition = format!(
            "(p.post_title LIKE ? OR CAST(p.ID AS CHAR) LIKE ? OR EXISTS (SELECT 1 FROM {pm} s \
             WHERE s.post_id = p.ID AND s.meta_key = '_sku' AND s.meta_value LIKE ?)"
        );
        let mut values = vec![pattern.as_str(); 3];
        if include_parent {
            condition.push_str(" OR CAST(p.post_parent AS CHAR) LIKE ?");
            values.push(pattern.as_str());
        }
        condition.push(')');
        filter.with_texts(condition, &values);
    }

    /// Product list in one of three modes (see [`SearchMode`]).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        status: Option<&str>,
        page: PageRequest,
    ) -> Result<(SearchMode, Vec<ProductListing>, u64), RepositoryError> {
        let mode = SearchMode::detect(search);
        let term = search.map(str::trim).unwrap_or_default();
        let status = status.filter(|s| !s.is_empty()).unwrap_or("publish");
        let mut filter = Filter::new();

        let (rows, total) = match mode {
            SearchMode::Sku => {
                let pm = self.tables.postmeta();
                let pattern = like_pattern(term);
                filter.raw("p.post_type = 'product_variation'").with_texts(
                    format!(
                        "(EXISTS (SELECT 1 FROM {pm} s WHERE s.post_id = p.ID \
                         AND s.meta_key = '_sku' AND s.meta_value LIKE ?) \
                         OR CAST(p.ID AS CHAR) LIKE ? OR CAST(p.post_parent AS CHAR) LIKE ?)"
                    ),
                    &[pattern.as_str(), pattern.as_str(), pattern.as_str()],
                );
                self.page(&filter, "p.ID DESC", page).await?
            }
            SearchMode::Name => {
                filter
                    .raw("p.post_type = 'product'")
                    .eq_text("p.post_status", status)
                    .search(&["p.post_title"], term);
                self.page(&filter, "p.post_date DESC, p.ID DESC", page)
                    .await?
            }
            SearchMode::Default => {
                filter
                    .raw("p.post_type = 'product'")
                    .eq_text("p.post_status", status);
                self.page(&filter, "p.post_date DESC, p.ID DESC", page)
                    .await?
            }
        };
        Ok((mode, rows, total))
    }

    /// Counts of product posts by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<ProductStats, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT post_status, COUNT(*) FROM {} WHERE post_type = 'product' GROUP BY post_status",
            self.tables.posts()
        ))
        .fetch_all(self.pool)
        .await?;

        let mut stats = ProductStats::default();
        for (status, count) in rows {
            stats.total += count;
            match status.as_str() {
                "publish" => stats.publish = count,
                "draft" => stats.draft = count,
                "pending" => stats.pending = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Variations of a product with their attributes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn variations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariationView>, RepositoryError> {
        let sql = format!(
            "{} WHERE p.post_type = 'product_variation' AND p.post_parent = ? ORDER BY p.ID",
            self.listing_select()
        );
        let rows: Vec<ListingRow> = sqlx::query_as(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        let listings: Vec<ProductListing> = rows.into_iter().map(|r| self.listing(r)).collect();

        let ids: Vec<ProductId> = listings.iter().map(|l| l.id).collect();
        let mut attributes = self.attributes_of(&ids).await?;

        Ok(listings
            .into_iter()
            .map(|l| VariationView {
                attributes: attributes.remove(&l.id).unwrap_or_default(),
                id: l.id,
                title: l.title,
                status: l.status,
                sku: l.sku,
                regular_price: l.regular_price,
                sale_price: l.sale_price,
                price: l.price,
                stock: l.stock,
                stock_status: l.stock_status,
                image_url: l.image_url,
            })
            .collect())
    }

    /// Attribute maps of several variations.
    async fn attributes_of(
        &self,
        ids: &[ProductId],
    ) -> Result<BTreeMap<ProductId, BTreeMap<String, String>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let sql = format!(
            "SELECT post_id, meta_key, meta_value FROM {} \
             WHERE post_id IN ({}) AND meta_key LIKE 'attribute\\_%' ORDER BY meta_id",
            self.tables.postmeta(),
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, (u64, String, Option<String>)>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(self.pool).await?;

        let mut raw: BTreeMap<ProductId, BTreeMap<String, String>> = BTreeMap::new();
        for (post_id, key, value) in rows {
            raw.entry(ProductId::new(post_id))
                .or_default()
                .entry(key)
                .or_insert_with(|| value.unwrap_or_default());
        }
        Ok(raw
            .into_iter()
            .map(|(id, metas)| (id, meta::attributes(&metas)))
            .collect())
    }

    /// A product or variation with its full meta map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct DetailRow {
            id: u64,
            parent_id: u64,
            title: String,
            status: String,
            post_type: String,
            date: Option<NaiveDateTime>,
            modified: Option<NaiveDateTime>,
            image_file: Option<String>,
        }

        let posts = self.tables.posts();
        let pm = self.tables.postmeta();
        let sql = format!(
            "SELECT p.ID AS id, p.post_parent AS parent_id, p.post_title AS title, \
             p.post_status AS status, p.post_type AS post_type, p.post_date AS date, \
             p.post_modified AS modified, COALESCE({own}, {parent}) AS image_file \
             FROM {posts} p LEFT JOIN {posts} parent ON parent.ID = p.post_parent \
             AND p.post_parent <> 0 \
             WHERE p.ID = ? AND p.post_type IN ('product', 'product_variation')",
            own = image_expr(&pm, "p"),
            parent = image_expr(&pm, "parent"),
        );
        let row: Option<DetailRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let meta = meta::all(&mut conn, self.tables, id.as_post()).await?;

        Ok(Some(ProductDetail {
            id: ProductId::new(row.id),
            parent_id: (row.parent_id != 0).then(|| ProductId::new(row.parent_id)),
            title: row.title,
            status: row.status,
            post_type: row.post_type,
            date: row.date,
            modified: row.modified,
            image_url: self.image_url(row.image_file),
            meta,
        }))
    }

    /// Published products and variations matching a title or SKU, for the
    /// order form. Variations are labelled with their parent title and
    /// attribute values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn search_for_order(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<ProductSearchHit>, RepositoryError> {
        let pm = self.tables.postmeta();
        let pattern = like_pattern(term);
        let mut filter = Filter::new();
        filter
            .raw("p.post_status = 'publish'")
            .raw("p.post_type IN ('product', 'product_variation')")
            .with_texts(
                format!(
                    "(p.post_title LIKE ? OR EXISTS (SELECT 1 FROM {pm} s WHERE s.post_id = p.ID \
                     AND s.meta_key = '_sku' AND s.meta_value LIKE ?))"
                ),
                &[pattern.as_str(), pattern.as_str()],
            );
        let sql = format!(
            "{}{} ORDER BY p.ID DESC LIMIT ?",
            self.listing_select(),
            filter.where_clause()
        );
        let rows: Vec<ListingRow> = filter
            .bind_as(sqlx::query_as(&sql))
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        let listings: Vec<ProductListing> = rows.into_iter().map(|r| self.listing(r)).collect();

        let variation_ids: Vec<ProductId> = listings
            .iter()
            .filter(|l| l.product_type == ProductType::Variation)
            .map(|l| l.id)
            .collect();
        let mut attributes = self.attributes_of(&variation_ids).await?;

        Ok(listings
            .into_iter()
            .map(|l| {
                let (product_id, variation_id, label) = match l.parent_id {
                    Some(parent) if l.product_type == ProductType::Variation => {
                        let attrs = attributes.remove(&l.id).unwrap_or_default();
                        let parent_title =
                            l.parent_title.clone().unwrap_or_else(|| l.title.clone());
                        (parent, Some(l.id), variation_label(&parent_title, &attrs))
                    }
                    _ => (l.id, None, l.title.clone()),
                };
                ProductSearchHit {
                    product_id,
                    variation_id,
                    label,
                    sku: l.sku,
                    price: l.price,
                    stock: l.stock,
                    stock_status: l.stock_status,
                    image_url: l.image_url,
                }
            })
            .collect())
    }

    /// Published products and variations for the stock screen.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stock_list(
        &self,
        search: &str,
        stock_filter: StockFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductListing>, u64), RepositoryError> {
        let pm = self.tables.postmeta();
        let mut filter = Filter::new();
        filter
            .raw("p.post_status = 'publish'")
            .raw("p.post_type IN ('product', 'product_variation')");
        self.sellable_search(&mut filter, search, true);

        let status = meta_expr(&pm, "p", "_stock_status");
        let stock = meta_expr(&pm, "p", "_stock");
        match stock_filter {
            StockFilter::All => {}
            StockFilter::InStock => {
                filter.eq_text(&status, StockStatus::InStock.as_str());
            }
            StockFilter::OutOfStock => {
                filter.eq_text(&status, StockStatus::OutOfStock.as_str());
            }
            StockFilter::Low(threshold) => {
                filter
                    .raw(format!("CAST({stock} AS SIGNED) > 0"))
                    .with_int(format!("CAST({stock} AS SIGNED) <= ?"), threshold);
            }
        }
        self.page(&filter, "p.ID DESC", page).await
    }

    /// Published products and variations for the price screen.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn price_list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<ProductListing>, u64), RepositoryError> {
        let mut filter = Filter::new();
        filter
            .raw("p.post_status = 'publish'")
            .raw("p.post_type IN ('product', 'product_variation')");
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            self.sellable_search(&mut filter, term, true);
        }
        self.page(&filter, "p.ID DESC", page).await
    }

    /// Count of published products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_published(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE post_type = 'product' AND post_status = 'publish'",
            self.tables.posts()
        ))
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Published products and variations with and without a sale price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn price_stats(&self) -> Result<PriceStats, RepositoryError> {
        let posts = self.tables.posts();
        let pm = self.tables.postmeta();
        let (total, with_sale): (i64, Option<Decimal>) = sqlx::query_as(&format!(
            "SELECT COUNT(*), SUM(CASE WHEN EXISTS (SELECT 1 FROM {pm} s WHERE s.post_id = p.ID \
             AND s.meta_key = '_sale_price' AND s.meta_value <> '') THEN 1 ELSE 0 END) \
             FROM {posts} p WHERE p.post_status = 'publish' \
             AND p.post_type IN ('product', 'product_variation')"
        ))
        .fetch_one(self.pool)
        .await?;

        let with_sale = with_sale.and_then(|d| d.to_i64()).unwrap_or(0);
        Ok(PriceStats {
            total,
            with_sale,
            without_sale: total - with_sale,
        })
    }

    /// One sellable product with its current prices and stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sellable(&self, id: ProductId) -> Result<Option<ProductListing>, RepositoryError> {
        let sql = format!(
            "{} WHERE p.ID = ? AND p.post_type IN ('product', 'product_variation')",
            self.listing_select()
        );
        let row: Option<ListingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| self.listing(r)))
    }
}

/// `Parent (v1, v2)`, or just the parent title without attributes.
fn variation_label(parent_title: &str, attributes: &BTreeMap<String, String>) -> String {
    let values: Vec<&str> = attributes
        .values()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        parent_title.to_string()
    } else {
        format!("{parent_title} ({})", values.join(", "))
    }
}

/// Post header of a product or variation.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn header(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: PostId,
) -> Result<Option<PostHeader>, RepositoryError> {
    let row: Option<HeaderRow> = sqlx::query_as(&format!(
        "SELECT ID AS id, post_parent AS parent_id, post_title AS title, \
         post_status AS status, post_type AS post_type FROM {} WHERE ID = ?",
        tables.posts()
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Set `_stock`, then `_stock_status`, then `_manage_stock = yes`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a write fails.
pub async fn write_stock(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: PostId,
    stock: i64,
) -> Result<(), RepositoryError> {
    meta::set(&mut *conn, tables, id, "_stock", &stock.to_string()).await?;
    meta::set(
        &mut *conn,
        tables,
        id,
        "_stock_status",
        StockStatus::for_quantity(stock).as_str(),
    )
    .await?;
    meta::set(conn, tables, id, "_manage_stock", "yes").await
}

/// Set `_regular_price`, `_sale_price` (deleted when `None`) and `_price`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a write fails.
pub async fn write_prices(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: PostId,
    regular: Decimal,
    sale: Option<Decimal>,
) -> Result<(), RepositoryError> {
    meta::set(&mut *conn, tables, id, "_regular_price", &regular.to_string()).await?;
    match sale {
        Some(sale) => meta::set(&mut *conn, tables, id, "_sale_price", &sale.to_string()).await?,
        None => meta::delete(&mut *conn, tables, id, "_sale_price").await?,
    }
    let active = sale.unwrap_or(regular);
    meta::set(conn, tables, id, "_price", &active.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_meta() {
        assert_eq!(decimal_meta(Some("59.90")), Some(Decimal::new(5990, 2)));
        assert_eq!(decimal_meta(Some(" 10 ")), Some(Decimal::from(10)));
        assert_eq!(decimal_meta(Some("")), None);
        assert_eq!(decimal_meta(Some("abc")), None);
        assert_eq!(decimal_meta(None), None);
    }

    #[test]
    fn test_stock_filter_from_query() {
        assert_eq!(StockFilter::from_query(None, 10), StockFilter::All);
        assert_eq!(StockFilter::from_query(Some("low"), 5), StockFilter::Low(5));
        assert_eq!(
            StockFilter::from_query(Some("outofstock"), 5),
            StockFilter::OutOfStock
        );
        assert_eq!(StockFilter::from_query(Some("bogus"), 5), StockFilter::All);
    }

    #[test]
    fn test_variation_label() {
        let attrs = BTreeMap::from([
            ("color".to_string(), "Rojo".to_string()),
            ("talla".to_string(), "M".to_string()),
        ]);
        assert_eq!(variation_label("Polo", &attrs), "Polo (Rojo, M)");
        assert_eq!(variation_label("Polo", &BTreeMap::new()), "Polo");
    }

    #[test]
    fn test_meta_expr_is_correlated() {
        assert_eq!(
            meta_expr("wp_postmeta", "p", "_sku"),
            "(SELECT meta_value FROM wp_postmeta WHERE post_id = p.ID AND meta_key = '_sku' \
             ORDER BY meta_id LIMIT 1)"
        );
    }
}
