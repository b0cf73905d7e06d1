//! Operating expenses.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::MySqlPool;
use thiserror::Error;

use woo_backoffice_core::store_time::store_today;
use woo_backoffice_core::{ExpenseId, PageRequest};

use crate::db::{ExpenseChanges, ExpenseFilter, ExpenseRepository, NewExpense, RepositoryError};
use crate::models::{CurrentUser, Expense, ExpenseStats};
use crate::services::auth::non_blank;

#[derive(Debug, Error)]
pub enum ExpenseError {
    #[error("{0}")]
    Validation(String),

    #[error("expense not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ExpenseError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Expense fields as submitted; every field is optional on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseForm {
    pub fecha: Option<String>,
    pub tipo_gasto: Option<String>,
    pub categoria: Option<String>,
    pub descripcion: Option<String>,
    pub monto: Option<Decimal>,
}

impl ExpenseForm {
    /// Validate a form for creation: every field present.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::Validation` naming the first bad field.
    pub fn into_new(self) -> Result<NewExpense, ExpenseError> {
        let changes = self.into_changes()?;
        let required = |field: &str| ExpenseError::Validation(format!("{field} is required"));
        Ok(NewExpense {
            fecha: changes.fecha.ok_or_else(|| required("fecha"))?,
            tipo_gasto: changes.tipo_gasto.ok_or_else(|| required("tipo_gasto"))?,
            categoria: changes.categoria.ok_or_else(|| required("categoria"))?,
            descripcion: changes.descripcion.ok_or_else(|| required("descripcion"))?,
            monto: changes.monto.ok_or_else(|| required("monto"))?,
        })
    }

    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::Validation` for a malformed date or a
    /// non-positive amount.
    pub fn into_changes(self) -> Result<ExpenseChanges, ExpenseError> {
        let fecha = non_blank(self.fecha.as_deref())
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ExpenseError::Validation("invalid date format, use YYYY-MM-DD".into())
                })
            })
            .transpose()?;
        if let Some(monto) = self.monto
            && monto <= Decimal::ZERO
        {
            return Err(ExpenseError::Validation("monto must be greater than 0".into()));
        }
        let text = |value: Option<String>| non_blank(value.as_deref()).map(str::to_string);
        Ok(ExpenseChanges {
            fecha,
            tipo_gasto: text(self.tipo_gasto),
            categoria: text(self.categoria),
            descripcion: text(self.descripcion),
            monto: self.monto,
        })
    }
}

/// Expense service.
pub struct ExpenseService<'a> {
    expenses: ExpenseRepository<'a>,
}

impl<'a> ExpenseService<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self {
            expenses: ExpenseRepository::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `ExpenseError::Repository` if the query fails.
    pub async fn list(
        &self,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Expense>, u64), ExpenseError> {
        Ok(self.expenses.list(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `ExpenseError::Validation` for an incomplete form.
    pub async fn create(
        &self,
        actor: &CurrentUser,
        form: ExpenseForm,
    ) -> Result<Expense, ExpenseError> {
        let expense = form.into_new()?;
        let created = self.expenses.create(&expense, actor.audit_name()).await?;
        tracing::info!(
            expense_id = %created.id,
            monto = %created.monto,
            user = %actor.username,
            "expense created"
        );
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `ExpenseError::NotFound` for an unknown id.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: ExpenseId,
        form: ExpenseForm,
    ) -> Result<Expense, ExpenseError> {
        let changes = form.into_changes()?;
        let updated = self
            .expenses
            .update(id, &changes, actor.audit_name())
            .await?;
        tracing::info!(expense_id = %id, user = %actor.username, "expense updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `ExpenseError::NotFound` for an unknown id.
    pub async fn delete(&self, actor: &CurrentUser, id: ExpenseId) -> Result<(), ExpenseError> {
        self.expenses.delete(id).await?;
        tracing::info!(expense_id = %id, user = %actor.username, "expense deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ExpenseError::Repository` if a query fails.
    pub async fn stats(&self) -> Result<ExpenseStats, ExpenseError> {
        Ok(self.expenses.stats(store_today(Utc::now())).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ExpenseForm {
        ExpenseForm {
            fecha: Some("2026-10-01".into()),
            tipo_gasto: Some("Operativo".into()),
            categoria: Some("Transporte".into()),
            descripcion: Some("Courier Lima".into()),
            monto: Some(Decimal::new(4550, 2)),
        }
    }

    #[test]
    fn test_complete_form_is_accepted() {
        let expense = form().into_new().unwrap();
        assert_eq!(expense.fecha, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(expense.monto, Decimal::new(4550, 2));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = ExpenseForm {
            categoria: Some("  ".into()),
            ..form()
        }
        .into_new()
        .unwrap_err();
        assert_eq!(err.to_string(), "categoria is required");
    }

    #[test]
    fn test_bad_date_and_amount() {
        let err = ExpenseForm {
            fecha: Some("01/10/2026".into()),
            ..form()
        }
        .into_new()
        .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));

        let err = ExpenseForm {
            monto: Some(Decimal::ZERO),
            ..ExpenseForm::default()
        }
        .into_changes()
        .unwrap_err();
        assert!(matches!(err, ExpenseError::Validation(_)));
    }

    #[test]
    fn test_partial_update_keeps_absent_fields() {
        let changes = ExpenseForm {
            descripcion: Some("Courier Callao".into()),
            ..ExpenseForm::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.descripcion.as_deref(), Some("Courier Callao"));
        assert!(changes.fecha.is_none());
        assert!(changes.monto.is_none());
    }
}
