//! Manual stock updates.

use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use woo_backoffice_core::stock::parse_stock;
use woo_backoffice_core::{PageRequest, ProductId};

use super::catalog::{BatchOutcome, CatalogError, load_target};
use crate::db::products::StockFilter;
use crate::db::{ProductRepository, StockHistoryRepository, Tables, meta, products};
use crate::models::{CurrentUser, NewStockHistory, ProductListing, StockHistoryEntry};

/// Rows shown on a product's stock history.
pub const HISTORY_LIMIT: u32 = 50;

/// One item of `/stock/update-multiple`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StockChange {
    pub id: ProductId,
    pub stock: i64,
}

/// Result of one stock update.
#[derive(Debug, Clone, Serialize)]
pub struct StockUpdate {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
    pub changed: bool,
}

/// Stock service.
pub struct StockService<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
    uploads_base: &'a str,
}

impl<'a> StockService<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables, uploads_base: &'a str) -> Self {
        Self {
            pool,
            tables,
            uploads_base,
        }
    }

    /// Search results for the stock screen; empty without a search term.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        filter: StockFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductListing>, u64), CatalogError> {
        let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok((Vec::new(), 0));
        };
        Ok(ProductRepository::new(self.pool, self.tables, self.uploads_base)
            .stock_list(term, filter, page)
            .await?)
    }

    /// Published product count.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn published_count(&self) -> Result<i64, CatalogError> {
        Ok(ProductRepository::new(self.pool, self.tables, self.uploads_base)
            .count_published()
            .await?)
    }

    /// Set a product's stock and record the change.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for negative stock,
    /// `CatalogError::ProductNotFound` for unknown products.
    #[tracing::instrument(skip(self, actor, reason), fields(user = %actor.username))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        product_id: ProductId,
        stock: i64,
        reason: &str,
    ) -> Result<StockUpdate, CatalogError> {
        if stock < 0 {
            return Err(CatalogError::Validation(
                "stock must be a whole number of at least 0".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let target = load_target(&mut *tx, self.tables, product_id).await?;
        let stored = meta::get(&mut *tx, self.tables, product_id.as_post(), "_stock").await?;
        let old_stock = stored.as_deref().and_then(parse_stock).unwrap_or(0);

        if stored.is_some() && old_stock == stock {
            return Ok(StockUpdate {
                product_id,
                old_stock,
                new_stock: stock,
                changed: false,
            });
        }

        products::write_stock(&mut *tx, self.tables, product_id.as_post(), stock).await?;
        tx.commit().await?;

        let entry = NewStockHistory {
            product_id,
            product_title: Some(&target.header.title),
            sku: target.sku.as_deref(),
            old_stock,
            new_stock: stock,
            changed_by: actor.audit_name(),
            reason,
        };
        if let Err(e) = StockHistoryRepository::new(self.pool, self.tables)
            .record(&entry)
            .await
        {
            tracing::warn!(error = %e, "failed to record stock history");
        }

        tracing::info!(old_stock, new_stock = stock, "stock updated");
        Ok(StockUpdate {
            product_id,
            old_stock,
            new_stock: stock,
            changed: true,
        })
    }

    /// Apply each change independently, collecting failures.
    pub async fn update_multiple(
        &self,
        actor: &CurrentUser,
        changes: &[StockChange],
        reason: &str,
    ) -> BatchOutcome<StockUpdate> {
        let mut outcome = BatchOutcome::default();
        for change in changes {
            let result = self.update(actor, change.id, change.stock, reason).await;
            outcome.push(change.id, result);
        }
        outcome
    }

    /// Latest history rows for a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn history(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockHistoryEntry>, CatalogError> {
        Ok(StockHistoryRepository::new(self.pool, self.tables)
            .for_product(product_id, HISTORY_LIMIT)
            .await?)
    }
}
