//! Exchange-rate and profit math for the profit report.
//!
//! Sales are in PEN, product costs are recorded in USD. The cost is converted
//! with the average exchange rate in force on the order date.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const TWO: Decimal = Decimal::from_parts(2, 0, 0, false, 0);
const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Mid-market rate stored alongside the buy and sell quotes.
#[must_use]
pub fn average_rate(buy: Decimal, sell: Decimal) -> Decimal {
    ((buy + sell) / TWO).round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Profit figures for a single order (or an aggregate of orders).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProfit {
    pub total_pen: Decimal,
    pub cost_usd: Decimal,
    /// `None` when no exchange rate was in force on the order date.
    pub exchange_rate: Option<Decimal>,
    pub cost_pen: Option<Decimal>,
    pub profit_pen: Option<Decimal>,
    /// `profit / total × 100`, 2 decimals; `None` for zero-value orders.
    pub margin_pct: Option<Decimal>,
}

impl OrderProfit {
    #[must_use]
    pub fn compute(total_pen: Decimal, cost_usd: Decimal, exchange_rate: Option<Decimal>) -> Self {
        let cost_pen = exchange_rate.map(|rate| round_cents(cost_usd * rate));
        let profit_pen = cost_pen.map(|cost| total_pen - cost);
        let margin_pct = profit_pen.and_then(|profit| margin(profit, total_pen));

        Self {
            total_pen,
            cost_usd,
            exchange_rate,
            cost_pen,
            profit_pen,
            margin_pct,
        }
    }

    /// Sum a period's orders. Orders without a rate contribute to sales and
    /// USD cost but not to the PEN cost or profit.
    #[must_use]
    pub fn summarize<'a>(orders: impl IntoIterator<Item = &'a Self>) -> PeriodProfit {
        let mut summary = PeriodProfit::default();
        for order in orders {
            summary.orders += 1;
            summary.sales_pen += order.total_pen;
            summary.cost_usd += order.cost_usd;
            if let (Some(cost), Some(profit)) = (order.cost_pen, order.profit_pen) {
                summary.cost_pen += cost;
                summary.profit_pen += profit;
                summary.priced_sales_pen += order.total_pen;
            }
        }
        summary.margin_pct = margin(summary.profit_pen, summary.priced_sales_pen);
        summary
    }
}

/// Aggregate over a reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodProfit {
    pub orders: u64,
    pub sales_pen: Decimal,
    pub cost_usd: Decimal,
    pub cost_pen: Decimal,
    pub profit_pen: Decimal,
    /// Sales of the orders that had an exchange rate.
    #[serde(skip)]
    pub priced_sales_pen: Decimal,
    pub margin_pct: Option<Decimal>,
}

fn margin(profit: Decimal, total: Decimal) -> Option<Decimal> {
    if total.is_zero() {
        return None;
    }
    Some(
        (profit / total * ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_average_rate() {
        assert_eq!(average_rate(d("3.70"), d("3.74")), d("3.72"));
        assert_eq!(average_rate(d("3.701"), d("3.702")), d("3.7015"));
    }

    #[test]
    fn test_order_profit() {
        let p = OrderProfit::compute(d("116.20"), d("15.00"), Some(d("3.72")));
        assert_eq!(p.cost_pen, Some(d("55.80")));
        assert_eq!(p.profit_pen, Some(d("60.40")));
        assert_eq!(p.margin_pct, Some(d("51.98")));
    }

    #[test]
    fn test_missing_rate_leaves_profit_unknown() {
        let p = OrderProfit::compute(d("50"), d("10"), None);
        assert_eq!(p.cost_pen, None);
        assert_eq!(p.profit_pen, None);
        assert_eq!(p.margin_pct, None);
    }

    #[test]
    fn test_zero_total_has_no_margin() {
        let p = OrderProfit::compute(Decimal::ZERO, d("1"), Some(d("3.7")));
        assert_eq!(p.profit_pen, Some(d("-3.70")));
        assert_eq!(p.margin_pct, None);
    }

    #[test]
    fn test_summarize() {
        let orders = [
            OrderProfit::compute(d("100"), d("10"), Some(d("3.5"))),
            OrderProfit::compute(d("200"), d("20"), Some(d("3.5"))),
            OrderProfit::compute(d("50"), d("5"), None),
        ];
        let s = OrderProfit::summarize(&orders);
        assert_eq!(s.orders, 3);
        assert_eq!(s.sales_pen, d("350"));
        assert_eq!(s.cost_usd, d("35"));
        assert_eq!(s.cost_pen, d("105"));
        assert_eq!(s.profit_pen, d("195"));
        assert_eq!(s.margin_pct, Some(d("65.00")));
    }
}
