//! Operating expenses (master only).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use woo_backoffice_core::ExpenseId;

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub fecha: NaiveDate,
    pub tipo_gasto: String,
    pub categoria: String,
    pub descripcion: String,
    pub monto: Decimal,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A labelled total (by type, category or month).
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseBucket {
    pub label: String,
    pub total: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseStats {
    pub total: Decimal,
    pub count: i64,
    pub by_type: Vec<ExpenseBucket>,
    pub by_category: Vec<ExpenseBucket>,
    /// `YYYY-MM` buckets for the last 12 months, oldest first.
    pub by_month: Vec<ExpenseBucket>,
}
