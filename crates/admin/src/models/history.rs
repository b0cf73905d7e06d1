//! Append-only stock and price audit rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use woo_backoffice_core::{PriceHistoryId, ProductId, StockHistoryId};

#[derive(Debug, Clone, Serialize)]
pub struct StockHistoryEntry {
    pub id: StockHistoryId,
    pub product_id: ProductId,
    pub product_title: Option<String>,
    pub sku: Option<String>,
    pub old_stock: Option<i64>,
    pub new_stock: Option<i64>,
    pub change_amount: Option<i64>,
    pub changed_by: String,
    pub change_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceHistoryEntry {
    pub id: PriceHistoryId,
    pub product_id: ProductId,
    pub product_title: Option<String>,
    pub sku: Option<String>,
    pub old_regular_price: Option<Decimal>,
    pub new_regular_price: Option<Decimal>,
    pub old_sale_price: Option<Decimal>,
    pub new_sale_price: Option<Decimal>,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
    pub changed_by: String,
    pub change_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new stock audit row.
#[derive(Debug, Clone)]
pub struct NewStockHistory<'a> {
    pub product_id: ProductId,
    pub product_title: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub old_stock: i64,
    pub new_stock: i64,
    pub changed_by: &'a str,
    pub reason: &'a str,
}

impl NewStockHistory<'_> {
    #[must_use]
    pub const fn change_amount(&self) -> i64 {
        self.new_stock - self.old_stock
    }
}

/// A regular/sale/active price triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceSet {
    pub regular: Option<Decimal>,
    pub sale: Option<Decimal>,
    pub active: Option<Decimal>,
}

/// A new price audit row.
#[derive(Debug, Clone)]
pub struct NewPriceHistory<'a> {
    pub product_id: ProductId,
    pub product_title: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub old: PriceSet,
    pub new: PriceSet,
    pub changed_by: &'a str,
    pub reason: &'a str,
}
