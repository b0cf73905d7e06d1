//! Pieces shared by the stock and price services.

use serde::Serialize;
use sqlx::MySqlConnection;
use thiserror::Error;

use woo_backoffice_core::ProductId;

use crate::db::{RepositoryError, Tables, meta, products};
use crate::models::PostHeader;

/// Errors from catalog writes.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A submitted value is out of range.
    #[error("{0}")]
    Validation(String),

    /// No product or variation with this ID.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A product or variation about to be changed, with its audit labels.
#[derive(Debug, Clone)]
pub struct CatalogTarget {
    pub header: PostHeader,
    pub sku: Option<String>,
}

/// Load a product or variation for update.
///
/// # Errors
///
/// Returns `CatalogError::ProductNotFound` if the post is missing or is not a
/// product.
pub async fn load_target(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: ProductId,
) -> Result<CatalogTarget, CatalogError> {
    let header = products::header(&mut *conn, tables, id.as_post())
        .await?
        .filter(|h| h.is_product() || h.is_variation())
        .ok_or(CatalogError::ProductNotFound(id))?;
    let sku = meta::get(conn, tables, id.as_post(), "_sku")
        .await?
        .filter(|s| !s.trim().is_empty());
    Ok(CatalogTarget { header, sku })
}

/// A per-item failure inside a batch update.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub id: ProductId,
    pub error: String,
}

/// Outcome of a batch update: every item is attempted on its own.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    pub updated: Vec<T>,
    pub errors: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            updated: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// File one item's result.
    pub fn push(&mut self, id: ProductId, result: Result<T, CatalogError>) {
        match result {
            Ok(value) => self.updated.push(value),
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "batch item failed");
                self.errors.push(ItemFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_outcome_collects_errors() {
        let mut outcome = BatchOutcome::default();
        outcome.push(ProductId::new(1), Ok(1));
        outcome.push(
            ProductId::new(2),
            Err(CatalogError::ProductNotFound(ProductId::new(2))),
        );
        assert_eq!(outcome.updated, vec![1]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].error, "product 2 not found");
    }
}
