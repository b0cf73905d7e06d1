//! Domain models for the back-office.
//!
//! Plain data carried between repositories, services and handlers. Types
//! that mirror WooCommerce rows use the column names WordPress uses.

pub mod exchange_rate;
pub mod expense;
pub mod history;
pub mod order;
pub mod product;
pub mod report;
pub mod session;
pub mod user;

pub use exchange_rate::ExchangeRate;
pub use expense::{Expense, ExpenseBucket, ExpenseStats};
pub use history::{
    NewPriceHistory, NewStockHistory, PriceHistoryEntry, PriceSet, StockHistoryEntry,
};
pub use order::{
    Address, AddressType, OrderDetail, OrderItemView, OrderLine, OrderRecord, OrderSummary,
};
pub use product::{
    PostHeader, ProductDetail, ProductListing, ProductSearchHit, ProductStats, ProductType,
    SearchMode, VariationView,
};
pub use report::{
    CostedOrder, DailySales, OrderProfitRow, ProfitReport, ReportRange, SalesSummary, StatusCount,
    TopProduct, UserSales,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{LoginRecord, User};
