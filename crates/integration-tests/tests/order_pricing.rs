//! End-to-end arithmetic of a manual order: pricing, numbering, stock and
//! profit, using the same building blocks the order service runs.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use woo_backoffice_core::pricing::format_amount;
use woo_backoffice_core::{
    LineAmounts, LineInput, OrderNumber, OrderProfit, OrderTotals, PricingError, StockOutcome,
    TAX_RATE,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn test_two_shirts_with_shipping_and_discount() {
    let totals = OrderTotals::calculate(
        &[LineInput::new(dec("59.00"), 2)],
        dec("10.00"),
        dec("10"),
    )
    .unwrap();

    assert_eq!(totals.products_total, dec("118.00"));
    assert_eq!(totals.discount_amount, dec("11.80"));
    assert_eq!(totals.total, dec("116.20"));
    assert_eq!(totals.subtotal, dec("98.47"));
    assert_eq!(totals.tax, dec("17.73"));
    assert_eq!(totals.subtotal + totals.tax, totals.total);
}

#[test]
fn test_discount_is_truncated_not_rounded() {
    let totals =
        OrderTotals::calculate(&[LineInput::new(dec("33.33"), 1)], Decimal::ZERO, dec("15"))
            .unwrap();
    // 33.33 × 15% = 4.9995
    assert_eq!(totals.discount_amount, dec("4.99"));
    assert_eq!(totals.total, dec("28.34"));
}

#[test]
fn test_mixed_cart_splits_reconstruct_total() {
    let lines = [
        LineInput::new(dec("49.90"), 3),
        LineInput::new(dec("12.50"), 1),
        LineInput::new(Decimal::ZERO, 4),
    ];
    let totals = OrderTotals::calculate(&lines, dec("15.00"), dec("7.5")).unwrap();

    let split = totals.split(&lines).unwrap();
    let gross: Decimal = split.lines.iter().map(|a| a.net + a.tax).sum::<Decimal>()
        + split.shipping.gross
        + split.discount.gross;
    assert_eq!(gross, totals.total, "items must add up to the order total");

    let net: Decimal = split.lines.iter().map(|a| a.net).sum::<Decimal>()
        + split.shipping.net
        + split.discount.net;
    let tax: Decimal = split.lines.iter().map(|a| a.tax).sum::<Decimal>()
        + split.shipping.tax
        + split.discount.tax;
    assert_eq!(net, totals.subtotal);
    assert_eq!(tax, totals.tax);
    assert_eq!(format_amount(totals.total), "165.04");
}

#[test]
fn test_absurd_quantities_are_rejected_not_panicking() {
    let lines = [LineInput::new(Decimal::MAX, 1), LineInput::new(Decimal::MAX, 1)];
    assert_eq!(
        OrderTotals::calculate(&lines, Decimal::ZERO, Decimal::ZERO),
        Err(PricingError::Overflow)
    );
    assert_eq!(
        OrderTotals::calculate(&[LineInput::new(dec("1.00"), 1)], Decimal::MAX, Decimal::ZERO),
        Err(PricingError::Overflow)
    );
}

#[test]
fn test_tax_rate_is_eighteen_percent() {
    assert_eq!(TAX_RATE, dec("0.18"));
    let split = LineAmounts::from_gross(dec("118.00"));
    assert_eq!(split.net, dec("100.00"));
    assert_eq!(split.tax, dec("18.00"));
}

#[test]
fn test_order_numbers_are_padded_and_parse_back() {
    let first = OrderNumber::format("W", 1).unwrap();
    assert_eq!(first.as_str(), "W-00001");
    let (prefix, sequence) = OrderNumber::parse("W-00042").unwrap();
    assert_eq!(prefix, "W");
    assert_eq!(sequence, 42);
    assert_eq!(OrderNumber::format("W", 123_456).unwrap().as_str(), "W-123456");
}

#[test]
fn test_ordering_more_than_stock_floors_at_zero() {
    let StockOutcome::Decrement(decrement) = StockOutcome::apply(Some("3"), 5) else {
        panic!("expected a decrement");
    };
    assert_eq!(decrement.new_stock, 0);
    assert!(decrement.floored);
    assert!(decrement.is_out_of_stock());
    assert_eq!(decrement.change(), -3);

    assert_eq!(StockOutcome::apply(None, 1), StockOutcome::NotTracked);
    assert_eq!(
        StockOutcome::apply(Some("lots"), 1),
        StockOutcome::Unparseable("lots".to_string())
    );
}

#[test]
fn test_profit_of_the_priced_order() {
    let totals = OrderTotals::calculate(
        &[LineInput::new(dec("59.00"), 2)],
        dec("10.00"),
        dec("10"),
    )
    .unwrap();
    let profit = OrderProfit::compute(totals.total, dec("20.00"), Some(dec("3.7000")));
    assert_eq!(profit.cost_pen, Some(dec("74.00")));
    assert_eq!(profit.profit_pen, Some(dec("42.20")));
    assert_eq!(profit.margin_pct, Some(dec("36.32")));

    let unpriced = OrderProfit::compute(totals.total, dec("20.00"), None);
    let summary = OrderProfit::summarize([&profit, &unpriced]);
    assert_eq!(summary.orders, 2);
    assert_eq!(summary.sales_pen, dec("232.40"));
    assert_eq!(summary.profit_pen, dec("42.20"));
    assert_eq!(summary.margin_pct, Some(dec("36.32")));
}
