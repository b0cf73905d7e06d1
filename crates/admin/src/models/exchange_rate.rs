//! Daily USD/PEN exchange rates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use woo_backoffice_core::ExchangeRateId;

#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRate {
    pub id: ExchangeRateId,
    pub fecha: NaiveDate,
    pub tasa_compra: Decimal,
    pub tasa_venta: Decimal,
    /// `(compra + venta) / 2`; used for cost conversion.
    pub tasa_promedio: Decimal,
    pub activo: bool,
    pub notas: Option<String>,
    pub actualizado_por: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
