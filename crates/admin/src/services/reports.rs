//! Sales, profit and exchange-rate reports.
//!
//! Dates are store-local. Without explicit bounds the sales reports cover
//! today and the profit report covers the last 30 days.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use thiserror::Error;

use woo_backoffice_core::OrderProfit;
use woo_backoffice_core::store_time::store_today;

use crate::db::exchange_rates::rate_on;
use crate::db::{ExchangeRateRepository, RepositoryError, ReportRepository, Tables};
use crate::models::{
    CostedOrder, CurrentUser, DailySales, ExchangeRate, OrderProfitRow, ProfitReport, ReportRange,
    SalesSummary, StatusCount, TopProduct, UserSales,
};

/// Days covered by the profit report when no range is given.
pub const DEFAULT_PROFIT_DAYS: u64 = 30;

/// Errors from report queries and rate maintenance.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),

    #[error("no exchange rate in force on {0}")]
    RateNotFound(NaiveDate),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Resolve optional bounds; missing ones fall back to `default_days`
/// ending today.
#[must_use]
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
    default_days: u64,
) -> ReportRange {
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| {
        end.checked_sub_days(Days::new(default_days.saturating_sub(1)))
            .unwrap_or(end)
    });
    ReportRange::new(start, end)
}

/// Parse a `YYYY-MM-DD` query value; blank means absent.
///
/// # Errors
///
/// Returns `ReportError::Validation` for malformed dates.
pub fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ReportError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::Validation(format!("{field} must be YYYY-MM-DD"))),
    }
}

/// Attach profit figures; rates come sorted oldest first.
#[must_use]
pub fn profit_rows(
    orders: Vec<CostedOrder>,
    rates: &[(NaiveDate, Decimal)],
) -> Vec<OrderProfitRow> {
    orders
        .into_iter()
        .map(|order| OrderProfitRow {
            profit: OrderProfit::compute(
                order.total_pen,
                order.cost_usd,
                rate_on(rates, order.date),
            ),
            id: order.id,
            order_number: order.order_number,
            date: order.date,
            status: order.status,
            customer_name: order.customer_name,
        })
        .collect()
}

/// Report service.
pub struct ReportService<'a> {
    pool: &'a MySqlPool,
    reports: ReportRepository<'a>,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables) -> Self {
        Self {
            pool,
            reports: ReportRepository::new(pool, tables),
        }
    }

    /// Store-local today.
    #[must_use]
    pub fn today() -> NaiveDate {
        store_today(Utc::now())
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn summary(&self, range: ReportRange) -> Result<SalesSummary, ReportError> {
        Ok(self.reports.summary(range).await?)
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn sales_by_day(&self, range: ReportRange) -> Result<Vec<DailySales>, ReportError> {
        Ok(self.reports.sales_by_day(range).await?)
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn top_products(
        &self,
        range: ReportRange,
        limit: u32,
    ) -> Result<Vec<TopProduct>, ReportError> {
        Ok(self.reports.top_products(range, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn sales_by_user(&self, range: ReportRange) -> Result<Vec<UserSales>, ReportError> {
        Ok(self.reports.sales_by_user(range).await?)
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn status_distribution(
        &self,
        range: ReportRange,
    ) -> Result<Vec<StatusCount>, ReportError> {
        Ok(self.reports.status_distribution(range).await?)
    }

    /// Profit per costed order plus the period summary.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if a query fails.
    #[tracing::instrument(skip(self))]
    pub async fn profits(&self, range: ReportRange) -> Result<ProfitReport, ReportError> {
        let orders = self.reports.costed_orders(range).await?;
        let rates = ExchangeRateRepository::new(self.pool)
            .averages_covering(range.start, range.end)
            .await?;

        let rows = profit_rows(orders, &rates);
        let summary = OrderProfit::summarize(rows.iter().map(|r| &r.profit));
        if rows.iter().any(|r| r.profit.exchange_rate.is_none()) {
            tracing::warn!("some orders have no exchange rate in force");
        }
        Ok(ProfitReport {
            period: range,
            summary,
            orders: rows,
        })
    }

    /// The rate in force on a date.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::RateNotFound` if no active rate exists at or
    /// before the date.
    pub async fn rate_in_force(&self, fecha: NaiveDate) -> Result<ExchangeRate, ReportError> {
        ExchangeRateRepository::new(self.pool)
            .in_force(fecha)
            .await?
            .ok_or(ReportError::RateNotFound(fecha))
    }

    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the query fails.
    pub async fn recent_rates(&self, limit: u32) -> Result<Vec<ExchangeRate>, ReportError> {
        Ok(ExchangeRateRepository::new(self.pool).recent(limit).await?)
    }

    /// Store the rate for a date.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Validation` unless both quotes are positive.
    pub async fn save_rate(
        &self,
        actor: &CurrentUser,
        fecha: NaiveDate,
        compra: Decimal,
        venta: Decimal,
        notas: Option<&str>,
    ) -> Result<ExchangeRate, ReportError> {
        if compra <= Decimal::ZERO || venta <= Decimal::ZERO {
            return Err(ReportError::Validation(
                "exchange rates must be greater than 0".into(),
            ));
        }
        let notas = notas.map(str::trim).filter(|s| !s.is_empty());
        let rate = ExchangeRateRepository::new(self.pool)
            .upsert(fecha, compra, venta, notas, actor.audit_name())
            .await?;
        tracing::info!(
            %fecha,
            tasa_promedio = %rate.tasa_promedio,
            user = %actor.username,
            "exchange rate saved"
        );
        Ok(rate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use woo_backoffice_core::OrderId;

    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_resolve_range_defaults() {
        let today = date(10, 18);
        assert_eq!(
            resolve_range(None, None, today, 1),
            ReportRange::new(today, today)
        );
        assert_eq!(
            resolve_range(None, None, today, DEFAULT_PROFIT_DAYS),
            ReportRange::new(date(9, 19), today)
        );
        assert_eq!(
            resolve_range(Some(date(10, 20)), Some(date(10, 1)), today, 1),
            ReportRange::new(date(10, 1), date(10, 20))
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some("2026-10-01"), "start_date").unwrap(), Some(date(10, 1)));
        assert_eq!(parse_date(Some(" "), "start_date").unwrap(), None);
        assert!(matches!(
            parse_date(Some("01/10/2026"), "start_date"),
            Err(ReportError::Validation(_))
        ));
    }

    #[test]
    fn test_profit_rows_use_rate_in_force() {
        let orders = vec![CostedOrder {
            id: OrderId::new(7),
            order_number: "W-00007".into(),
            date: date(10, 5),
            status: "completed".into(),
            total_pen: Decimal::new(11620, 2),
            cost_usd: Decimal::from(20),
            customer_name: "Juan Pérez".into(),
        }];
        let rates = vec![(date(10, 1), Decimal::new(37, 1))];
        let rows = profit_rows(orders, &rates);
        assert_eq!(rows[0].profit.cost_pen, Some(Decimal::new(7400, 2)));
        assert_eq!(rows[0].profit.profit_pen, Some(Decimal::new(4220, 2)));
        assert_eq!(rows[0].order_number, "W-00007");
    }
}
