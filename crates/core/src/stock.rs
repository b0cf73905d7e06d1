//! Stock decrement rule applied to each order line.
//!
//! `_stock` is free-form postmeta text. Values like `"5"`, `"5.0"` or `" 7 "`
//! are accepted and truncated to an integer. Anything else is left untouched
//! so the caller can log it and move on.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::types::StockStatus;

/// Result of applying an ordered quantity to a stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub previous: i64,
    pub quantity: u32,
    pub new_stock: i64,
    /// The order asked for more than was available; stock stopped at zero.
    pub floored: bool,
}

impl StockDecrement {
    /// Whether `_stock_status` must flip to `outofstock`.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.new_stock == 0
    }

    #[must_use]
    pub const fn status(&self) -> StockStatus {
        StockStatus::for_quantity(self.new_stock)
    }

    /// Signed change recorded in stock history.
    #[must_use]
    pub const fn change(&self) -> i64 {
        self.new_stock.saturating_sub(self.previous)
    }
}

/// What to do with one line's stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockOutcome {
    Decrement(StockDecrement),
    /// The product has no `_stock` meta, so stock is not managed.
    NotTracked,
    /// The stored value could not be read as a number.
    Unparseable(String),
}

impl StockOutcome {
    /// Subtract `quantity` from the stored counter, never going below zero.
    #[must_use]
    pub fn apply(stored: Option<&str>, quantity: u32) -> Self {
        let Some(raw) = stored else {
            return Self::NotTracked;
        };
        let Some(previous) = parse_stock(raw) else {
            return Self::Unparseable(raw.to_string());
        };

        let wanted = previous.saturating_sub(i64::from(quantity));
        Self::Decrement(StockDecrement {
            previous,
            quantity,
            new_stock: wanted.max(0),
            floored: wanted < 0,
        })
    }
}

/// Read a `_stock` value as an integer, truncating any fractional part.
#[must_use]
pub fn parse_stock(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()?.trunc().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decrement(stored: &str, qty: u32) -> StockDecrement {
        match StockOutcome::apply(Some(stored), qty) {
            StockOutcome::Decrement(d) => d,
            other => panic!("expected decrement, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_quantity_runs_out() {
        let d = decrement("5", 5);
        assert_eq!(d.new_stock, 0);
        assert!(d.is_out_of_stock());
        assert!(!d.floored);
        assert_eq!(d.status(), StockStatus::OutOfStock);
    }

    #[test]
    fn test_oversell_floors_at_zero() {
        let d = decrement("3", 5);
        assert_eq!(d.new_stock, 0);
        assert!(d.floored);
        assert!(d.is_out_of_stock());
        assert_eq!(d.change(), -3);
    }

    #[test]
    fn test_partial_decrement_keeps_stock() {
        let d = decrement("10", 4);
        assert_eq!(d.new_stock, 6);
        assert_eq!(d.status(), StockStatus::InStock);
        assert_eq!(d.change(), -4);
    }

    #[test]
    fn test_float_text_is_truncated() {
        assert_eq!(decrement("7.9", 2).new_stock, 5);
        assert_eq!(decrement(" 4.0 ", 0).new_stock, 4);
    }

    #[test]
    fn test_extreme_stored_values_saturate() {
        let d = decrement("-9223372036854775808", 1);
        assert_eq!(d.previous, i64::MIN);
        assert_eq!(d.new_stock, 0);
        assert!(d.floored);
        assert_eq!(d.change(), i64::MAX);

        let d = decrement("9223372036854775807", u32::MAX);
        assert_eq!(d.new_stock, i64::MAX - i64::from(u32::MAX));
        assert!(!d.floored);
    }

    #[test]
    fn test_negative_stored_value_floors() {
        let d = decrement("-2", 1);
        assert_eq!(d.new_stock, 0);
        assert!(d.floored);
    }

    #[test]
    fn test_missing_and_garbage() {
        assert_eq!(StockOutcome::apply(None, 1), StockOutcome::NotTracked);
        assert_eq!(
            StockOutcome::apply(Some("lots"), 1),
            StockOutcome::Unparseable("lots".to_string())
        );
        assert_eq!(
            StockOutcome::apply(Some(""), 1),
            StockOutcome::Unparseable(String::new())
        );
    }
}
