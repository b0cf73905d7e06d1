//! Projection of an [`OrderRecord`] onto WooCommerce's two storages.
//!
//! HPOS reads `wc_orders_meta` next to the typed `wc_orders*` columns; older
//! plugins and reports read the shadow post's `postmeta`, where the typed
//! columns have to be spelled out as meta too. Both lists come from the same
//! record, so they cannot disagree on a shared key.

use rust_decimal::Decimal;

use woo_backoffice_core::TAX_RATE;
use woo_backoffice_core::pricing::format_amount;

use crate::models::{Address, AddressType, OrderLine, OrderRecord};

/// `_created_via` for orders created here.
pub const CREATED_VIA: &str = "backoffice";

/// `_order_source` for manual orders.
pub const ORDER_SOURCE: &str = "whatsapp";

/// Rate code of the IGV tax item.
pub const TAX_RATE_CODE: &str = "PE-IGV-1";

/// Name of the shipping item.
pub const SHIPPING_ITEM_NAME: &str = "Envío";

type MetaRows = Vec<(String, String)>;

fn row(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Meta shared by both storages.
#[must_use]
pub fn order_meta(record: &OrderRecord) -> MetaRows {
    vec![
        row("_order_number", record.number.as_str()),
        row("_created_via", CREATED_VIA),
        row("_order_source", ORDER_SOURCE),
        row("_created_by", record.created_by.as_str()),
        row(
            "_wc_discount_amount",
            format_amount(record.totals.discount_amount),
        ),
        row(
            "_wc_discount_percentage",
            record.totals.discount_percentage.normalize().to_string(),
        ),
        row("_billing_address_index", record.billing.search_index()),
        row("_shipping_address_index", record.shipping.search_index()),
        row("_wc_order_attribution_source_type", "admin"),
        row("is_vat_exempt", "no"),
        row("_recorded_sales", "no"),
        row("_new_order_email_sent", "false"),
        row("_order_stock_reduced", "yes"),
    ]
}

/// Meta for the shadow post: the shared rows plus the typed columns and the
/// flattened addresses.
#[must_use]
pub fn legacy_meta(record: &OrderRecord, woocommerce_version: &str) -> MetaRows {
    let totals = &record.totals;
    let shipping = record.shipping_amounts;
    let discount = record.discount_amounts;

    let mut rows = order_meta(record);
    rows.extend([
        row("_order_key", record.order_key.as_str()),
        row("_order_currency", record.currency.as_str()),
        row("_prices_include_tax", "yes"),
        row("_payment_method", record.payment_method.as_str()),
        row("_payment_method_title", record.payment_method_title.as_str()),
        row("_customer_user", "0"),
        row("_order_total", format_amount(totals.total)),
        row("_order_tax", format_amount(totals.tax - shipping.tax)),
        row("_order_shipping", format_amount(shipping.net)),
        row("_order_shipping_tax", format_amount(shipping.tax)),
        row("_cart_discount", format_amount(Decimal::ZERO - discount.net)),
        row("_cart_discount_tax", format_amount(Decimal::ZERO - discount.tax)),
        row("_order_version", woocommerce_version),
        row(
            "_customer_ip_address",
            record.ip_address.clone().unwrap_or_default(),
        ),
        row(
            "_customer_user_agent",
            record.user_agent.clone().unwrap_or_default(),
        ),
    ]);
    rows.extend(flatten_address(AddressType::Billing, &record.billing));
    rows.extend(flatten_address(AddressType::Shipping, &record.shipping));
    rows
}

/// `_billing_first_name`, `_billing_last_name`, ...
fn flatten_address(
    kind: AddressType,
    address: &Address,
) -> impl Iterator<Item = (String, String)> {
    address
        .fields()
        .map(|(field, value)| (format!("_{}_{field}", kind.as_str()), value.trim().to_string()))
        .into_iter()
}

/// An order item ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub name: String,
    pub item_type: &'static str,
    pub meta: MetaRows,
}

/// Every item of the order: product lines, shipping, the optional discount
/// fee and the tax summary, in that order.
#[must_use]
pub fn items(record: &OrderRecord) -> Vec<ItemRow> {
    let mut items: Vec<ItemRow> = record.lines.iter().map(product_item).collect();
    items.push(shipping_item(record));
    if record.totals.has_discount() {
        items.push(discount_item(record));
    }
    items.push(tax_item(record));
    items
}

fn product_item(line: &OrderLine) -> ItemRow {
    let amounts = line.amounts;
    ItemRow {
        name: line.name.clone(),
        item_type: "line_item",
        meta: vec![
            row("_product_id", line.product_id.to_string()),
            row(
                "_variation_id",
                line.variation_id.map_or_else(|| "0".to_string(), |v| v.to_string()),
            ),
            row("_qty", line.quantity.to_string()),
            row("_tax_class", ""),
            row("_line_subtotal", format_amount(amounts.net)),
            row("_line_subtotal_tax", format_amount(amounts.tax)),
            row("_line_total", format_amount(amounts.net)),
            row("_line_tax", format_amount(amounts.tax)),
            row("_reduced_stock", line.quantity.to_string()),
        ],
    }
}

fn shipping_item(record: &OrderRecord) -> ItemRow {
    let shipping = record.shipping_amounts;
    ItemRow {
        name: SHIPPING_ITEM_NAME.to_string(),
        item_type: "shipping",
        meta: vec![
            row("method_id", "flat_rate"),
            row("instance_id", "0"),
            row("cost", format_amount(shipping.net)),
            row("total_tax", format_amount(shipping.tax)),
        ],
    }
}

fn discount_item(record: &OrderRecord) -> ItemRow {
    let discount = record.discount_amounts;
    ItemRow {
        name: format!(
            "Descuento ({}%)",
            record.totals.discount_percentage.normalize()
        ),
        item_type: "fee",
        meta: vec![
            row("_fee_amount", format_amount(discount.net)),
            row("_tax_class", ""),
            row("_tax_status", "taxable"),
            row("_line_total", format_amount(discount.net)),
            row("_line_tax", format_amount(discount.tax)),
        ],
    }
}

fn tax_item(record: &OrderRecord) -> ItemRow {
    let shipping_tax = record.shipping_amounts.tax;
    ItemRow {
        name: TAX_RATE_CODE.to_string(),
        item_type: "tax",
        meta: vec![
            row("rate_id", "0"),
            row("label", "IGV"),
            row("compound", ""),
            row("tax_amount", format_amount(record.totals.tax - shipping_tax)),
            row("shipping_tax_amount", format_amount(shipping_tax)),
            row(
                "rate_percent",
                (TAX_RATE * Decimal::ONE_HUNDRED).normalize().to_string(),
            ),
        ],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use woo_backoffice_core::{LineInput, OrderNumber, OrderStatus, OrderTotals, ProductId};

    use super::*;

    fn record(lines: &[(&str, u32)], shipping: Decimal, discount: Decimal) -> OrderRecord {
        let inputs: Vec<LineInput> = lines
            .iter()
            .map(|(price, quantity)| LineInput::new(price.parse().unwrap(), *quantity))
            .collect();
        let totals = OrderTotals::calculate(&inputs, shipping, discount).unwrap();
        let split = totals.split(&inputs).unwrap();
        let created = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();
        let billing = Address {
            first_name: "Juan".into(),
            last_name: "Pérez".into(),
            address_1: "Av. Principal 123".into(),
            city: "Lima".into(),
            state: "LIM".into(),
            country: "PE".into(),
            phone: "987654321".into(),
            ..Address::default()
        };
        OrderRecord {
            number: OrderNumber::format("W", 1).unwrap(),
            order_key: "wc_order_abcdefghijklm".into(),
            status: OrderStatus::Pending,
            currency: "PEN".into(),
            created_at_gmt: created,
            created_at_local: created,
            shipping: billing.clone(),
            billing,
            lines: inputs
                .iter()
                .zip(split.lines)
                .map(|(input, amounts)| OrderLine {
                    product_id: ProductId::new(1),
                    variation_id: None,
                    name: "Polo".into(),
                    sku: Some("POL0001".into()),
                    quantity: input.quantity,
                    unit_price: input.unit_price,
                    amounts,
                })
                .collect(),
            totals,
            shipping_amounts: split.shipping,
            discount_amounts: split.discount,
            payment_method: "cod".into(),
            payment_method_title: "Pago manual".into(),
            customer_note: String::new(),
            created_by: "ana".into(),
            ip_address: Some("10.0.0.1".into()),
            user_agent: None,
        }
    }

    fn scenario(discount: Decimal) -> OrderRecord {
        record(&[("59.00", 2)], Decimal::from(10), discount)
    }

    fn meta_map(rows: &[(String, String)]) -> BTreeMap<&str, &str> {
        rows.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_shared_keys_agree_across_storages() {
        let record = scenario(Decimal::from(10));
        let hpos = order_meta(&record);
        let legacy = legacy_meta(&record, "9.0.0");
        let legacy = meta_map(&legacy);
        for (key, value) in &hpos {
            assert_eq!(legacy.get(key.as_str()), Some(&value.as_str()), "{key}");
        }
    }

    #[test]
    fn test_legacy_totals() {
        let record = scenario(Decimal::from(10));
        let legacy = legacy_meta(&record, "9.0.0");
        let meta = meta_map(&legacy);
        assert_eq!(meta["_order_number"], "W-00001");
        assert_eq!(meta["_order_total"], "116.20");
        assert_eq!(meta["_wc_discount_amount"], "11.80");
        assert_eq!(meta["_wc_discount_percentage"], "10");
        assert_eq!(meta["_order_shipping"], "8.47");
        assert_eq!(meta["_order_shipping_tax"], "1.53");
        assert_eq!(meta["_billing_city"], "Lima");
        assert_eq!(meta["_shipping_phone"], "987654321");
        assert_eq!(meta["_customer_user_agent"], "");
    }

    #[test]
    fn test_items_without_discount() {
        let items = items(&scenario(Decimal::ZERO));
        let kinds: Vec<&str> = items.iter().map(|i| i.item_type).collect();
        assert_eq!(kinds, ["line_item", "shipping", "tax"]);
    }

    #[test]
    fn test_item_amounts_reconstruct_total() {
        let record = scenario(Decimal::from(10));
        let items = items(&record);
        let kinds: Vec<&str> = items.iter().map(|i| i.item_type).collect();
        assert_eq!(kinds, ["line_item", "shipping", "fee", "tax"]);

        let amount = |item: &ItemRow, key: &str| -> Decimal {
            meta_map(&item.meta)[key].parse().unwrap()
        };
        let line = amount(&items[0], "_line_total") + amount(&items[0], "_line_tax");
        let shipping = amount(&items[1], "cost") + amount(&items[1], "total_tax");
        let fee = amount(&items[2], "_line_total") + amount(&items[2], "_line_tax");
        assert_eq!(line + shipping + fee, record.totals.total);

        assert_eq!(items[2].name, "Descuento (10%)");
        let tax = meta_map(&items[3].meta);
        assert_eq!(tax["rate_percent"], "18");
        let product_tax: Decimal = tax["tax_amount"].parse().unwrap();
        let shipping_tax: Decimal = tax["shipping_tax_amount"].parse().unwrap();
        assert_eq!(product_tax + shipping_tax, record.totals.tax);
    }

    #[test]
    fn test_item_taxes_match_order_tax() {
        let record = record(&[("1.00", 1), ("1.00", 1), ("1.00", 1)], Decimal::ZERO, Decimal::ZERO);
        let items = items(&record);
        let (mut net, mut tax) = (Decimal::ZERO, Decimal::ZERO);
        for item in items.iter().filter(|i| i.item_type == "line_item") {
            let meta = meta_map(&item.meta);
            net += meta["_line_total"].parse::<Decimal>().unwrap();
            tax += meta["_line_tax"].parse::<Decimal>().unwrap();
        }
        assert_eq!(net, record.totals.subtotal);
        assert_eq!(tax, record.totals.tax);

        let legacy = legacy_meta(&record, "9.0.0");
        let meta = meta_map(&legacy);
        assert_eq!(meta["_order_tax"], "0.46");
        assert_eq!(meta["_order_shipping_tax"], "0.00");
    }

    #[test]
    fn test_cart_discount_is_positive() {
        let record = scenario(Decimal::from(10));
        let legacy = legacy_meta(&record, "9.0.0");
        let meta = meta_map(&legacy);
        assert_eq!(meta["_cart_discount"], "10.00");
        assert_eq!(meta["_cart_discount_tax"], "1.80");
    }
}
