//! Catalog views over `posts`/`postmeta`.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use woo_backoffice_core::{PostId, ProductId, StockStatus};

/// Product kind as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    Variable,
    Variation,
}

impl ProductType {
    /// Classify a post. Parents with children are `variable`.
    #[must_use]
    pub fn classify(post_type: &str, variation_count: i64) -> Self {
        if post_type == "product_variation" {
            Self::Variation
        } else if variation_count > 0 {
            Self::Variable
        } else {
            Self::Simple
        }
    }
}

/// How `/products/list` interprets its search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Term contains a digit: match variations by SKU, ID or parent ID.
    Sku,
    /// Match parent products by title.
    Name,
    /// No term: latest parent products.
    Default,
}

impl SearchMode {
    #[must_use]
    pub fn detect(search: Option<&str>) -> Self {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::Default,
            Some(term) if term.chars().any(|c| c.is_ascii_digit()) => Self::Sku,
            Some(_) => Self::Name,
        }
    }
}

/// Post counts by status.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProductStats {
    pub total: i64,
    pub publish: i64,
    pub draft: i64,
    pub pending: i64,
}

/// One row of `/products/list` and `/stock/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub id: ProductId,
    pub parent_id: Option<ProductId>,
    pub parent_title: Option<String>,
    pub title: String,
    pub status: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub sku: Option<String>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    /// Active price (`_price`)
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub stock_status: Option<StockStatus>,
    /// `_manage_stock = yes`
    pub manage_stock: bool,
    pub variations_count: i64,
    pub image_url: Option<String>,
    pub date: Option<NaiveDateTime>,
}

/// A product with its full meta map.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub parent_id: Option<ProductId>,
    pub title: String,
    pub status: String,
    pub post_type: String,
    pub date: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub image_url: Option<String>,
    pub meta: BTreeMap<String, String>,
}

/// A variation with its attributes, prices and stock.
#[derive(Debug, Clone, Serialize)]
pub struct VariationView {
    pub id: ProductId,
    pub title: String,
    pub status: String,
    pub attributes: BTreeMap<String, String>,
    pub sku: Option<String>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub image_url: Option<String>,
}

/// Result row for the order form's product picker.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSearchHit {
    /// Parent product for variations, the product itself otherwise.
    pub product_id: ProductId,
    pub variation_id: Option<ProductId>,
    /// Parent title plus attribute values for variations.
    pub label: String,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub image_url: Option<String>,
}

/// Minimal post header used when validating order lines.
#[derive(Debug, Clone)]
pub struct PostHeader {
    pub id: PostId,
    pub parent_id: PostId,
    pub title: String,
    pub status: String,
    pub post_type: String,
}

impl PostHeader {
    #[must_use]
    pub fn is_product(&self) -> bool {
        self.post_type == "product"
    }

    #[must_use]
    pub fn is_variation(&self) -> bool {
        self.post_type == "product_variation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_detect() {
        assert_eq!(SearchMode::detect(None), SearchMode::Default);
        assert_eq!(SearchMode::detect(Some("  ")), SearchMode::Default);
        assert_eq!(SearchMode::detect(Some("polo")), SearchMode::Name);
        assert_eq!(SearchMode::detect(Some("PL123")), SearchMode::Sku);
    }

    #[test]
    fn test_classify() {
        assert_eq!(ProductType::classify("product", 0), ProductType::Simple);
        assert_eq!(ProductType::classify("product", 3), ProductType::Variable);
        assert_eq!(
            ProductType::classify("product_variation", 0),
            ProductType::Variation
        );
    }
}
