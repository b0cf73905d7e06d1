//! Report rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use woo_backoffice_core::{OrderId, OrderProfit, PeriodProfit, ProductId};

/// Inclusive range of store-local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportRange {
    /// Swaps the bounds if they arrive reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SalesSummary {
    pub total_orders: u64,
    pub total_sales: Decimal,
    pub avg_order_value: Decimal,
    pub completed_orders: u64,
    pub cancelled_orders: u64,
    pub processing_orders: u64,
    pub total_discounts: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: u64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity_sold: i64,
    pub times_ordered: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSales {
    pub username: String,
    pub full_name: String,
    pub total_orders: u64,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// One order with a known USD cost, before conversion.
#[derive(Debug, Clone)]
pub struct CostedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub date: NaiveDate,
    pub status: String,
    pub total_pen: Decimal,
    pub cost_usd: Decimal,
    pub customer_name: String,
}

/// A costed order with its profit figures.
#[derive(Debug, Clone, Serialize)]
pub struct OrderProfitRow {
    pub id: OrderId,
    pub order_number: String,
    pub date: NaiveDate,
    pub status: String,
    pub customer_name: String,
    #[serde(flatten)]
    pub profit: OrderProfit,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitReport {
    pub period: ReportRange,
    pub summary: PeriodProfit,
    pub orders: Vec<OrderProfitRow>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_orders_bounds() {
        let a = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(ReportRange::new(b, a), ReportRange { start: a, end: b });
        assert_eq!(ReportRange::new(a, a).end, a);
    }
}
