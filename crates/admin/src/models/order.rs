//! Order types.
//!
//! [`OrderRecord`] is the single authoritative description of a manually
//! created order. The HPOS rows and the legacy `postmeta` rows are both
//! derived from it, so the two storages cannot disagree.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use woo_backoffice_core::{
    LineAmounts, OrderId, OrderItemId, OrderNumber, OrderStatus, OrderTotals, ProductId,
};

/// Which of the two order addresses a row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Billing,
    Shipping,
}

impl AddressType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Shipping => "shipping",
        }
    }
}

/// A postal address with contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub email: String,
    pub phone: String,
}

fn default_country() -> String {
    "PE".to_string()
}

impl Address {
    /// `(field, value)` pairs in WooCommerce's column order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &str); 11] {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("company", &self.company),
            ("address_1", &self.address_1),
            ("address_2", &self.address_2),
            ("city", &self.city),
            ("state", &self.state),
            ("postcode", &self.postcode),
            ("country", &self.country),
            ("email", &self.email),
            ("phone", &self.phone),
        ]
    }

    /// Space-joined search index (`_billing_address_index`).
    #[must_use]
    pub fn search_index(&self) -> String {
        self.fields()
            .iter()
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// One priced product line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variation_id: Option<ProductId>,
    /// Item name shown in wp-admin and e-mails.
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    /// Unit price, tax included.
    pub unit_price: Decimal,
    /// `unit_price × quantity` split into net and tax, balanced against
    /// the order totals.
    pub amounts: LineAmounts,
}

impl OrderLine {
    /// The post whose stock this line consumes.
    #[must_use]
    pub fn stock_target(&self) -> ProductId {
        self.variation_id.unwrap_or(self.product_id)
    }
}

/// Everything known about a new order before it is written.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub number: OrderNumber,
    /// `wc_order_` plus 13 random alphanumerics.
    pub order_key: String,
    pub status: OrderStatus,
    pub currency: String,
    pub created_at_gmt: NaiveDateTime,
    /// Store-local creation time (for `posts.post_date`).
    pub created_at_local: NaiveDateTime,
    pub billing: Address,
    pub shipping: Address,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    /// Shipping charge share of the order's net and tax.
    pub shipping_amounts: LineAmounts,
    /// Discount share of the order's net and tax, as negative amounts.
    pub discount_amounts: LineAmounts,
    pub payment_method: String,
    pub payment_method_title: String,
    pub customer_note: String,
    /// Operator username.
    pub created_by: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl OrderRecord {
    /// Total quantity across product lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// One row of `/orders/list`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: Option<String>,
    pub status: String,
    pub currency: Option<String>,
    pub total: Option<Decimal>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub created_by: Option<String>,
    pub source: Option<String>,
    pub date_created: Option<NaiveDateTime>,
}

/// A stored order line with its meta.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub id: OrderItemId,
    pub name: String,
    pub item_type: String,
    pub meta: BTreeMap<String, String>,
}

/// Full order for `/orders/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub status: String,
    pub currency: Option<String>,
    pub total: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub payment_method: Option<String>,
    pub payment_method_title: Option<String>,
    pub customer_note: Option<String>,
    pub date_created: Option<NaiveDateTime>,
    pub date_updated: Option<NaiveDateTime>,
    pub billing: Option<Address>,
    pub shipping: Option<Address>,
    pub items: Vec<OrderItemView>,
    pub meta: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            first_name: "Juan".into(),
            last_name: "Pérez".into(),
            address_1: "Av. Principal 123".into(),
            city: "Lima".into(),
            state: "LIM".into(),
            country: "PE".into(),
            phone: "987654321".into(),
            ..Address::default()
        }
    }

    #[test]
    fn test_search_index_skips_empty_fields() {
        assert_eq!(
            address().search_index(),
            "Juan Pérez Av. Principal 123 Lima LIM PE 987654321"
        );
    }

    #[test]
    fn test_full_name() {
        assert_eq!(address().full_name(), "Juan Pérez");
        assert_eq!(Address::default().full_name(), "");
    }

    #[test]
    fn test_stock_target_prefers_variation() {
        let line = OrderLine {
            product_id: ProductId::new(10),
            variation_id: Some(ProductId::new(11)),
            name: "Polo".into(),
            sku: None,
            quantity: 1,
            unit_price: Decimal::ONE,
            amounts: LineAmounts::from_gross(Decimal::ONE),
        };
        assert_eq!(line.stock_target(), ProductId::new(11));
    }
}
