//! Business logic services for the back-office.
//!
//! # Services
//!
//! - `auth` - Login, registration and password hashing
//! - `catalog` - Shared lookups for stock and price maintenance
//! - `expenses` - Operating expenses
//! - `orders` - Manual order creation and order views
//! - `prices` - Regular/sale price maintenance
//! - `reports` - Sales, profit and exchange-rate reports
//! - `stock` - Stock maintenance
//! - `users` - Operator account management

pub mod auth;
pub mod catalog;
pub mod expenses;
pub mod orders;
pub mod prices;
pub mod reports;
pub mod stock;
pub mod users;

pub use auth::{AuthError, AuthService};
pub use catalog::{BatchOutcome, CatalogError};
pub use expenses::{ExpenseError, ExpenseService};
pub use orders::{OrderError, OrderService};
pub use prices::PriceService;
pub use reports::{ReportError, ReportService};
pub use stock::StockService;
pub use users::UserService;
