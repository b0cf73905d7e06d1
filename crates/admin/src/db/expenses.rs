//! Expense repository (`expense_details`).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use woo_backoffice_core::{ExpenseId, PageRequest};

use super::{Filter, RepositoryError};
use crate::models::{Expense, ExpenseBucket, ExpenseStats};

const EXPENSE_COLUMNS: &str = "id, fecha, tipo_gasto, categoria, descripcion, monto, \
                               created_by, updated_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: u64,
    fecha: NaiveDate,
    tipo_gasto: String,
    categoria: String,
    descripcion: String,
    monto: Decimal,
    created_by: Option<String>,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: ExpenseId::new(row.id),
            fecha: row.fecha,
            tipo_gasto: row.tipo_gasto,
            categoria: row.categoria,
            descripcion: row.descripcion,
            monto: row.monto,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Filters for the expense list.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Matches description, type or category.
    pub search: Option<String>,
    pub tipo_gasto: Option<String>,
    pub categoria: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ExpenseFilter {
    fn conditions(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(term) = self.search.as_deref().filter(|s| !s.is_empty()) {
            filter.search(&["descripcion", "tipo_gasto", "categoria"], term);
        }
        if let Some(tipo) = self.tipo_gasto.as_deref().filter(|s| !s.is_empty()) {
            filter.eq_text("tipo_gasto", tipo);
        }
        if let Some(categoria) = self.categoria.as_deref().filter(|s| !s.is_empty()) {
            filter.eq_text("categoria", categoria);
        }
        if let Some(from) = self.date_from {
            filter.date_from("fecha", from);
        }
        if let Some(to) = self.date_to {
            filter.date_to("fecha", to);
        }
        filter
    }
}

/// A complete new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub fecha: NaiveDate,
    pub tipo_gasto: String,
    pub categoria: String,
    pub descripcion: String,
    pub monto: Decimal,
}

/// A partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ExpenseChanges {
    pub fecha: Option<NaiveDate>,
    pub tipo_gasto: Option<String>,
    pub categoria: Option<String>,
    pub descripcion: Option<String>,
    pub monto: Option<Decimal>,
}

/// First day of the month `months` before the month of `today`.
fn month_start_back(today: NaiveDate, months: u32) -> NaiveDate {
    let index = today.year() * 12 + i32::try_from(today.month0()).unwrap_or(0)
        - i32::try_from(months).unwrap_or(0);
    let year = index.div_euclid(12);
    let month = u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Repository for operating expenses.
pub struct ExpenseRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ExpenseRepository<'a> {
    /// Create a new expense repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Get one expense.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ExpenseId) -> Result<Option<Expense>, RepositoryError> {
        let row: Option<ExpenseRow> = sqlx::query_as(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense_details WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Filtered page ordered by date then id, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<(Vec<Expense>, u64), RepositoryError> {
        let conditions = filter.conditions();
        let clause = conditions.where_clause();

        let total: i64 = conditions
            .bind_scalar(sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM expense_details{clause}"
            )))
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<ExpenseRow> = conditions
            .bind_as(sqlx::query_as(&format!(
                "SELECT {EXPENSE_COLUMNS} FROM expense_details{clause} \
                 ORDER BY fecha DESC, id DESC LIMIT ? OFFSET ?"
            )))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok((
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or(0),
        ))
    }

    /// Insert an expense.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        expense: &NewExpense,
        created_by: &str,
    ) -> Result<Expense, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO expense_details (fecha, tipo_gasto, categoria, descripcion, monto, \
             created_by, updated_by) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.fecha)
        .bind(&expense.tipo_gasto)
        .bind(&expense.categoria)
        .bind(&expense.descripcion)
        .bind(expense.monto)
        .bind(created_by)
        .bind(created_by)
        .execute(self.pool)
        .await?;

        self.get(ExpenseId::new(result.last_insert_id()))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the expense does not exist.
    pub async fn update(
        &self,
        id: ExpenseId,
        changes: &ExpenseChanges,
        updated_by: &str,
    ) -> Result<Expense, RepositoryError> {
        if self.get(id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE expense_details SET fecha = COALESCE(?, fecha), \
             tipo_gasto = COALESCE(?, tipo_gasto), categoria = COALESCE(?, categoria), \
             descripcion = COALESCE(?, descripcion), monto = COALESCE(?, monto), \
             updated_by = ? WHERE id = ?",
        )
        .bind(changes.fecha)
        .bind(changes.tipo_gasto.as_deref())
        .bind(changes.categoria.as_deref())
        .bind(changes.descripcion.as_deref())
        .bind(changes.monto)
        .bind(updated_by)
        .bind(id)
        .execute(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Hard delete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the expense does not exist.
    pub async fn delete(&self, id: ExpenseId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM expense_details WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Totals overall, by type, by category, and for the last 12 months.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(&self, today: NaiveDate) -> Result<ExpenseStats, RepositoryError> {
        let (total, count): (Option<Decimal>, i64) =
            sqlx::query_as("SELECT SUM(monto), COUNT(*) FROM expense_details")
                .fetch_one(self.pool)
                .await?;

        let by_type = self
            .buckets(
                "SELECT tipo_gasto, SUM(monto), COUNT(*) FROM expense_details \
                 GROUP BY tipo_gasto ORDER BY SUM(monto) DESC",
                None,
            )
            .await?;
        let by_category = self
            .buckets(
                "SELECT categoria, SUM(monto), COUNT(*) FROM expense_details \
                 GROUP BY categoria ORDER BY SUM(monto) DESC",
                None,
            )
            .await?;
        let by_month = self
            .buckets(
                "SELECT DATE_FORMAT(fecha, '%Y-%m') AS month, SUM(monto), COUNT(*) \
                 FROM expense_details WHERE fecha >= ? GROUP BY month ORDER BY month",
                Some(month_start_back(today, 11)),
            )
            .await?;

        Ok(ExpenseStats {
            total: total.unwrap_or_default(),
            count,
            by_type,
            by_category,
            by_month,
        })
    }

    async fn buckets(
        &self,
        sql: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<ExpenseBucket>, RepositoryError> {
        let mut query = sqlx::query_as::<_, (String, Option<Decimal>, i64)>(sql);
        if let Some(since) = since {
            query = query.bind(since);
        }
        let rows = query.fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(label, total, count)| ExpenseBucket {
                label,
                total: total.unwrap_or_default(),
                count,
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_start_back_crosses_year() {
        assert_eq!(month_start_back(date(2024, 3, 15), 11), date(2023, 4, 1));
        assert_eq!(month_start_back(date(2024, 12, 31), 11), date(2024, 1, 1));
        assert_eq!(month_start_back(date(2024, 1, 1), 0), date(2024, 1, 1));
    }

    #[test]
    fn test_filter_conditions() {
        let filter = ExpenseFilter {
            tipo_gasto: Some("Operativo".into()),
            date_to: Some(date(2024, 5, 31)),
            ..ExpenseFilter::default()
        };
        assert_eq!(
            filter.conditions().where_clause(),
            " WHERE tipo_gasto = ? AND fecha <= ?"
        );
    }
}
