//! Exchange-rate repository (`woo_tipo_cambio`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use woo_backoffice_core::{ExchangeRateId, average_rate};

use super::RepositoryError;
use crate::models::ExchangeRate;

const RATE_COLUMNS: &str = "id, fecha, tasa_compra, tasa_venta, tasa_promedio, activo, notas, \
                            actualizado_por, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ExchangeRateRow {
    id: u64,
    fecha: NaiveDate,
    tasa_compra: Decimal,
    tasa_venta: Decimal,
    tasa_promedio: Decimal,
    activo: bool,
    notas: Option<String>,
    actualizado_por: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExchangeRateRow> for ExchangeRate {
    fn from(row: ExchangeRateRow) -> Self {
        Self {
            id: ExchangeRateId::new(row.id),
            fecha: row.fecha,
            tasa_compra: row.tasa_compra,
            tasa_venta: row.tasa_venta,
            tasa_promedio: row.tasa_promedio,
            activo: row.activo,
            notas: row.notas,
            actualizado_por: row.actualizado_por,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for daily exchange rates.
pub struct ExchangeRateRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ExchangeRateRepository<'a> {
    /// Create a new exchange-rate repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// The rate in force on `fecha`: the latest active rate at or before it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn in_force(
        &self,
        fecha: NaiveDate,
    ) -> Result<Option<ExchangeRate>, RepositoryError> {
        let row: Option<ExchangeRateRow> = sqlx::query_as(&format!(
            "SELECT {RATE_COLUMNS} FROM woo_tipo_cambio \
             WHERE activo = TRUE AND fecha <= ? ORDER BY fecha DESC LIMIT 1"
        ))
        .bind(fecha)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// The most recent active rates, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ExchangeRate>, RepositoryError> {
        let rows: Vec<ExchangeRateRow> = sqlx::query_as(&format!(
            "SELECT {RATE_COLUMNS} FROM woo_tipo_cambio \
             WHERE activo = TRUE ORDER BY fecha DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active average rates covering `[from, to]`, oldest first.
    ///
    /// Includes the last rate before `from`, so every day in the range has
    /// a rate in force if one exists at all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn averages_covering(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Decimal)>, RepositoryError> {
        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            "SELECT fecha, tasa_promedio FROM woo_tipo_cambio \
             WHERE activo = TRUE AND fecha <= ? AND fecha >= COALESCE( \
                 (SELECT MAX(fecha) FROM woo_tipo_cambio WHERE activo = TRUE AND fecha <= ?), ?) \
             ORDER BY fecha",
        )
        .bind(to)
        .bind(from)
        .bind(from)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert or replace the rate for a date and mark it active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert(
        &self,
        fecha: NaiveDate,
        compra: Decimal,
        venta: Decimal,
        notas: Option<&str>,
        actualizado_por: &str,
    ) -> Result<ExchangeRate, RepositoryError> {
        sqlx::query(
            "INSERT INTO woo_tipo_cambio \
             (fecha, tasa_compra, tasa_venta, tasa_promedio, activo, notas, actualizado_por) \
             VALUES (?, ?, ?, ?, TRUE, ?, ?) \
             ON DUPLICATE KEY UPDATE tasa_compra = VALUES(tasa_compra), \
             tasa_venta = VALUES(tasa_venta), tasa_promedio = VALUES(tasa_promedio), \
             activo = TRUE, notas = VALUES(notas), actualizado_por = VALUES(actualizado_por)",
        )
        .bind(fecha)
        .bind(compra)
        .bind(venta)
        .bind(average_rate(compra, venta))
        .bind(notas)
        .bind(actualizado_por)
        .execute(self.pool)
        .await?;

        let row: Option<ExchangeRateRow> = sqlx::query_as(&format!(
            "SELECT {RATE_COLUMNS} FROM woo_tipo_cambio WHERE fecha = ?"
        ))
        .bind(fecha)
        .fetch_optional(self.pool)
        .await?;
        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }
}

/// Rate in force on `date` from a list sorted oldest first.
#[must_use]
pub fn rate_on(rates: &[(NaiveDate, Decimal)], date: NaiveDate) -> Option<Decimal> {
    let index = rates.partition_point(|(fecha, _)| *fecha <= date);
    index
        .checked_sub(1)
        .and_then(|i| rates.get(i))
        .map(|(_, rate)| *rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_rate_on_falls_back_to_previous_date() {
        let rates = vec![
            (date(1), Decimal::new(37_000, 4)),
            (date(10), Decimal::new(37_500, 4)),
        ];
        assert_eq!(rate_on(&rates, date(1)), Some(Decimal::new(37_000, 4)));
        assert_eq!(rate_on(&rates, date(9)), Some(Decimal::new(37_000, 4)));
        assert_eq!(rate_on(&rates, date(10)), Some(Decimal::new(37_500, 4)));
        assert_eq!(rate_on(&rates, date(31)), Some(Decimal::new(37_500, 4)));
    }

    #[test]
    fn test_rate_on_before_first_rate_is_none() {
        let rates = vec![(date(10), Decimal::new(37_500, 4))];
        assert_eq!(rate_on(&rates, date(9)), None);
        assert_eq!(rate_on(&[], date(9)), None);
    }
}
