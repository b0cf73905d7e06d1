//! Tax-inclusive order pricing.
//!
//! Unit prices already contain 18% IGV. Totals are computed on the gross
//! amounts and the tax is recovered at the end by dividing out the rate.
//! The discount is truncated to the cent, never rounded, so it can never
//! round in the customer's favor.
//!
//! The order's net and tax are then spread over its items (product lines,
//! shipping and discount) so the item amounts add up to the order totals to
//! the cent.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IGV rate baked into every unit price (18%).
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Errors for inputs the calculator refuses to price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("line {index}: unit price cannot be negative")]
    NegativePrice { index: usize },

    #[error("shipping cost cannot be negative")]
    NegativeShipping,

    #[error("discount percentage must be between 0 and 100")]
    DiscountOutOfRange,

    #[error("order amounts are too large")]
    Overflow,

    #[error("lines do not match the priced order")]
    LinesMismatch,
}

/// One priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    /// Unit price including tax.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineInput {
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`, tax included.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the product does not fit.
    pub fn gross(&self) -> Result<Decimal, PricingError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(PricingError::Overflow)
    }
}

/// A tax-inclusive amount split into its net and tax parts.
///
/// `net + tax == gross` always holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub gross: Decimal,
    pub net: Decimal,
    pub tax: Decimal,
}

impl LineAmounts {
    /// Decompose a tax-inclusive amount. The net part is rounded to the cent
    /// and the tax absorbs the remainder.
    #[must_use]
    pub fn from_gross(gross: Decimal) -> Self {
        let net =
            exact_net(gross).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            gross,
            net,
            tax: gross - net,
        }
    }
}

/// Totals for a whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Σ(unit price × quantity), tax included.
    pub products_total: Decimal,
    /// Discount percentage applied to `products_total`.
    pub discount_percentage: Decimal,
    /// `products_total × pct / 100`, truncated to 2 decimals.
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    /// `products_total − discount_amount + shipping_cost`.
    pub total: Decimal,
    /// `total / 1.18`, rounded to the cent.
    pub subtotal: Decimal,
    /// `total − subtotal`.
    pub tax: Decimal,
}

impl OrderTotals {
    /// Price an order.
    ///
    /// Zero-quantity and zero-price lines are allowed and contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] for negative prices or shipping, a discount
    /// percentage outside `0..=100`, or amounts too large to represent.
    pub fn calculate(
        lines: &[LineInput],
        shipping_cost: Decimal,
        discount_percentage: Decimal,
    ) -> Result<Self, PricingError> {
        if let Some(index) = lines.iter().position(|l| l.unit_price.is_sign_negative()) {
            return Err(PricingError::NegativePrice { index });
        }
        if shipping_cost.is_sign_negative() {
            return Err(PricingError::NegativeShipping);
        }
        if discount_percentage.is_sign_negative() || discount_percentage > ONE_HUNDRED {
            return Err(PricingError::DiscountOutOfRange);
        }

        let products_total = sum_gross(lines)?;
        let discount_amount = truncate_cents(
            products_total
                .checked_mul(discount_percentage)
                .ok_or(PricingError::Overflow)?
                / ONE_HUNDRED,
        );
        let total = (products_total - discount_amount)
            .checked_add(shipping_cost)
            .ok_or(PricingError::Overflow)?;
        let split = LineAmounts::from_gross(total);

        Ok(Self {
            products_total,
            discount_percentage,
            discount_amount,
            shipping_cost,
            total,
            subtotal: split.net,
            tax: split.tax,
        })
    }

    /// Spread `subtotal` and `tax` over the order's items.
    ///
    /// Every part is first rounded down to the cent; the cents still missing
    /// from `subtotal` go to the parts that lost the most. The resulting nets
    /// sum to `subtotal` and the taxes to `tax` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::LinesMismatch`] if `lines` are not the lines
    /// these totals were calculated from.
    pub fn split(&self, lines: &[LineInput]) -> Result<TaxSplit, PricingError> {
        if sum_gross(lines)? != self.products_total {
            return Err(PricingError::LinesMismatch);
        }

        let mut grosses = lines
            .iter()
            .map(LineInput::gross)
            .collect::<Result<Vec<_>, _>>()?;
        grosses.push(self.shipping_cost);
        grosses.push(Decimal::ZERO - self.discount_amount);

        let mut nets: Vec<Decimal> = grosses
            .iter()
            .map(|g| exact_net(*g).round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity))
            .collect();
        let mut order: Vec<(usize, Decimal)> = grosses
            .iter()
            .zip(&nets)
            .map(|(g, n)| exact_net(*g) - n)
            .enumerate()
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let floored: Decimal = nets.iter().sum();
        let missing = ((self.subtotal - floored) / CENT)
            .to_usize()
            .filter(|cents| *cents <= nets.len())
            .ok_or(PricingError::LinesMismatch)?;
        for (index, _) in order.into_iter().take(missing) {
            if let Some(net) = nets.get_mut(index) {
                *net += CENT;
            }
        }

        let mut amounts: Vec<LineAmounts> = grosses
            .into_iter()
            .zip(nets)
            .map(|(gross, net)| LineAmounts {
                gross,
                net,
                tax: gross - net,
            })
            .collect();
        let discount = amounts.pop().ok_or(PricingError::LinesMismatch)?;
        let shipping = amounts.pop().ok_or(PricingError::LinesMismatch)?;
        Ok(TaxSplit {
            lines: amounts,
            shipping,
            discount,
        })
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        !self.discount_amount.is_zero()
    }
}

/// An order's net and tax spread over its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxSplit {
    /// One entry per product line, in order.
    pub lines: Vec<LineAmounts>,
    pub shipping: LineAmounts,
    /// Negative amounts.
    pub discount: LineAmounts,
}

fn sum_gross(lines: &[LineInput]) -> Result<Decimal, PricingError> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.gross()?).ok_or(PricingError::Overflow)
    })
}

/// `gross / 1.18` before rounding.
fn exact_net(gross: Decimal) -> Decimal {
    gross / (Decimal::ONE + TAX_RATE)
}

/// Drop everything past the second decimal place.
#[must_use]
pub fn truncate_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Render an amount with exactly two decimals, as WooCommerce stores it.
#[must_use]
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
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
    fn test_discount_truncates_instead_of_rounding() {
        let totals =
            OrderTotals::calculate(&[LineInput::new(d("100.00"), 1)], Decimal::ZERO, d("33.33"))
                .unwrap();
        assert_eq!(totals.discount_amount, d("33.33"));

        let totals =
            OrderTotals::calculate(&[LineInput::new(d("19.99"), 1)], Decimal::ZERO, d("16.67"))
                .unwrap();
        assert_eq!(totals.discount_amount, d("3.33"));

        let totals =
            OrderTotals::calculate(&[LineInput::new(d("0.99"), 1)], Decimal::ZERO, d("50"))
                .unwrap();
        assert_eq!(totals.discount_amount, d("0.49"));
    }

    #[test]
    fn test_whatsapp_order_scenario() {
        let totals =
            OrderTotals::calculate(&[LineInput::new(d("59.00"), 2)], d("10.00"), d("10")).unwrap();

        assert_eq!(totals.products_total, d("118.00"));
        assert_eq!(totals.discount_amount, d("11.80"));
        assert_eq!(totals.total, d("116.20"));
        assert_eq!(totals.subtotal, d("98.47"));
        assert_eq!(totals.tax, d("17.73"));
    }

    #[test]
    fn test_subtotal_plus_tax_reconstructs_total() {
        let cases = [
            (vec![("12.34", 3), ("0.01", 7)], "4.50", "7.5"),
            (vec![("999.99", 1)], "0", "0"),
            (vec![("1.00", 1), ("2.00", 2), ("3.33", 3)], "15.00", "100"),
        ];
        for (lines, shipping, pct) in cases {
            let lines: Vec<_> = lines
                .iter()
                .map(|(p, q)| LineInput::new(d(p), *q))
                .collect();
            let t = OrderTotals::calculate(&lines, d(shipping), d(pct)).unwrap();
            assert_eq!(t.subtotal + t.tax, t.total);
            assert_eq!(t.total, t.products_total - t.discount_amount + t.shipping_cost);
        }
    }

    #[test]
    fn test_zero_lines_contribute_nothing() {
        let totals = OrderTotals::calculate(
            &[
                LineInput::new(d("50.00"), 0),
                LineInput::new(Decimal::ZERO, 4),
                LineInput::new(d("20.00"), 1),
            ],
            Decimal::ZERO,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(totals.products_total, d("20.00"));
        assert!(!totals.has_discount());
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let line = [LineInput::new(d("-1"), 1)];
        assert_eq!(
            OrderTotals::calculate(&line, Decimal::ZERO, Decimal::ZERO),
            Err(PricingError::NegativePrice { index: 0 })
        );

        let line = [LineInput::new(d("1"), 1)];
        assert_eq!(
            OrderTotals::calculate(&line, d("-0.01"), Decimal::ZERO),
            Err(PricingError::NegativeShipping)
        );
        assert_eq!(
            OrderTotals::calculate(&line, Decimal::ZERO, d("100.01")),
            Err(PricingError::DiscountOutOfRange)
        );
        assert!(OrderTotals::calculate(&line, Decimal::ZERO, d("100")).is_ok());
    }

    #[test]
    fn test_split_matches_scenario() {
        let lines = [LineInput::new(d("59.00"), 2)];
        let totals = OrderTotals::calculate(&lines, d("10.00"), d("10")).unwrap();
        let split = totals.split(&lines).unwrap();

        assert_eq!(split.lines[0].net, d("100.00"));
        assert_eq!(split.lines[0].tax, d("18.00"));
        assert_eq!(split.shipping.net, d("8.47"));
        assert_eq!(split.shipping.tax, d("1.53"));
        assert_eq!(split.discount.gross, d("-11.80"));
        assert_eq!(split.discount.net, d("-10.00"));
        assert_eq!(split.discount.tax, d("-1.80"));
    }

    #[test]
    fn test_split_parts_add_up_to_order_totals() {
        let cases = [
            (vec![("1.00", 1), ("1.00", 1), ("1.00", 1)], "0", "0"),
            (vec![("12.34", 3), ("0.01", 7), ("5.55", 1)], "4.50", "7.5"),
            (vec![("0.99", 1), ("0.99", 1), ("0.99", 1), ("0.99", 1)], "0.99", "33.33"),
            (vec![("19.90", 2), ("0", 4), ("7.77", 0)], "0", "0"),
            (vec![("100.00", 1)], "0", "100"),
        ];
        for (lines, shipping, pct) in cases {
            let lines: Vec<_> = lines
                .iter()
                .map(|(p, q)| LineInput::new(d(p), *q))
                .collect();
            let totals = OrderTotals::calculate(&lines, d(shipping), d(pct)).unwrap();
            let split = totals.split(&lines).unwrap();

            let parts: Vec<LineAmounts> = split
                .lines
                .iter()
                .copied()
                .chain([split.shipping, split.discount])
                .collect();
            let net: Decimal = parts.iter().map(|p| p.net).sum();
            let tax: Decimal = parts.iter().map(|p| p.tax).sum();
            assert_eq!(net, totals.subtotal, "{lines:?}");
            assert_eq!(tax, totals.tax, "{lines:?}");
            for part in &parts {
                assert_eq!(part.net + part.tax, part.gross);
                assert_eq!(part.net.round_dp(2), part.net);
            }
        }
    }

    #[test]
    fn test_split_gives_cents_to_largest_remainders() {
        let lines = [LineInput::new(d("1.00"), 1); 3];
        let totals = OrderTotals::calculate(&lines, Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, d("2.54"));
        assert_eq!(totals.tax, d("0.46"));

        let split = totals.split(&lines).unwrap();
        let nets: Vec<Decimal> = split.lines.iter().map(|l| l.net).collect();
        assert_eq!(nets, [d("0.85"), d("0.85"), d("0.84")]);
        assert_eq!(split.shipping.net, Decimal::ZERO);
        assert_eq!(split.discount.net, Decimal::ZERO);
    }

    #[test]
    fn test_split_rejects_other_lines() {
        let lines = [LineInput::new(d("10.00"), 1)];
        let totals = OrderTotals::calculate(&lines, Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(
            totals.split(&[LineInput::new(d("10.00"), 2)]),
            Err(PricingError::LinesMismatch)
        );
    }

    #[test]
    fn test_huge_amounts_are_errors() {
        assert_eq!(
            OrderTotals::calculate(
                &[LineInput::new(Decimal::MAX, 2)],
                Decimal::ZERO,
                Decimal::ZERO
            ),
            Err(PricingError::Overflow)
        );
        assert_eq!(
            OrderTotals::calculate(
                &[LineInput::new(Decimal::MAX, 1), LineInput::new(Decimal::MAX, 1)],
                Decimal::ZERO,
                Decimal::ZERO
            ),
            Err(PricingError::Overflow)
        );
        assert_eq!(
            OrderTotals::calculate(&[LineInput::new(Decimal::MAX, 1)], Decimal::ZERO, d("50")),
            Err(PricingError::Overflow)
        );
        assert_eq!(
            OrderTotals::calculate(&[LineInput::new(Decimal::MAX, 1)], Decimal::MAX, Decimal::ZERO),
            Err(PricingError::Overflow)
        );
        assert_eq!(LineInput::new(Decimal::MAX, 3).gross(), Err(PricingError::Overflow));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(d("116.2")), "116.20");
        assert_eq!(format_amount(d("17.725")), "17.73");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
    }
}
