//! Order creation error types.

use thiserror::Error;

use woo_backoffice_core::{OrderNumberError, PricingError, ProductId};

use crate::db::RepositoryError;

/// Errors that can occur while creating or reading orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request payload is incomplete or inconsistent.
    #[error("{0}")]
    Validation(String),

    /// A line references a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The calculator refused the amounts.
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// The order-number counter or prefix is unusable.
    #[error("order number error: {0}")]
    Number(#[from] OrderNumberError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

impl OrderError {
    /// A duplicate key on the shadow post: another writer took the ID.
    #[must_use]
    pub const fn is_id_conflict(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Conflict(_)))
    }
}
