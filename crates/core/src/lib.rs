//! Woo Backoffice Core - Shared domain types.
//!
//! This crate provides the types and business rules shared by the
//! back-office components:
//! - `admin` - JSON back-office server over the WordPress/WooCommerce database
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! running MySQL server.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, statuses, emails, pagination
//! - [`pricing`] - Tax-inclusive order totals
//! - [`order_number`] - Human-facing order numbers (`W-00001`)
//! - [`stock`] - Stock decrement rule for order lines
//! - [`sequence`] - Auto-increment collision guard decision
//! - [`profit`] - Exchange-rate and profit math for reports
//! - [`store_time`] - Store-local (UTC-5) clock

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod order_number;
pub mod pricing;
pub mod profit;
pub mod sequence;
pub mod stock;
pub mod store_time;
pub mod types;

pub use order_number::{OrderNumber, OrderNumberError};
pub use pricing::{LineAmounts, LineInput, OrderTotals, PricingError, TAX_RATE, TaxSplit};
pub use profit::{OrderProfit, PeriodProfit, average_rate};
pub use sequence::next_auto_increment;
pub use stock::{StockDecrement, StockOutcome};
pub use types::*;
