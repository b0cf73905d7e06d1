//! Price updates: single, fixed batch, percentage batch and sale removal.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};

use woo_backoffice_core::{PageRequest, ProductId};

use super::catalog::{BatchOutcome, CatalogError, load_target};
use crate::db::products::{PriceStats, decimal_meta};
use crate::db::{PriceHistoryRepository, ProductRepository, Tables, meta, products};
use crate::models::{CurrentUser, NewPriceHistory, PriceHistoryEntry, PriceSet, ProductListing};

/// Rows shown on a product's price history.
pub const HISTORY_LIMIT: u32 = 50;

/// Which price a percentage change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTo {
    #[default]
    Regular,
    Sale,
    Both,
}

/// One item of a fixed-price batch.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FixedPrice {
    pub id: ProductId,
    pub regular_price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

/// `/prices/update-multiple` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BulkPriceChange {
    Percentage {
        products: Vec<ProductId>,
        percentage: Decimal,
        #[serde(default)]
        apply_to: ApplyTo,
    },
    Fixed {
        products: Vec<FixedPrice>,
    },
    RemoveSale {
        products: Vec<ProductId>,
    },
}

/// Result of one price update.
#[derive(Debug, Clone, Serialize)]
pub struct PriceUpdate {
    pub product_id: ProductId,
    pub old: PriceSet,
    pub new: PriceSet,
    pub changed: bool,
}

/// Check a regular/sale pair.
///
/// # Errors
///
/// Returns `CatalogError::Validation` unless `regular > 0` and
/// `0 <= sale < regular`.
pub fn validate_prices(regular: Decimal, sale: Option<Decimal>) -> Result<(), CatalogError> {
    if regular <= Decimal::ZERO {
        return Err(CatalogError::Validation(
            "regular price must be greater than 0".into(),
        ));
    }
    if let Some(sale) = sale {
        if sale.is_sign_negative() {
            return Err(CatalogError::Validation("sale price cannot be negative".into()));
        }
        if sale >= regular {
            return Err(CatalogError::Validation(
                "sale price must be lower than the regular price".into(),
            ));
        }
    }
    Ok(())
}

/// `price × (1 + pct/100)`, rounded half-even to the cent.
#[must_use]
pub fn adjust_by_percentage(price: Decimal, percentage: Decimal) -> Decimal {
    (price * (Decimal::ONE + percentage / Decimal::ONE_HUNDRED))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// New regular/sale pair for a percentage change.
///
/// # Errors
///
/// Returns `CatalogError::Validation` when the sale price is targeted but the
/// product has none.
fn percentage_target(
    current: PriceSet,
    percentage: Decimal,
    apply_to: ApplyTo,
) -> Result<(Decimal, Option<Decimal>), CatalogError> {
    let regular = current
        .regular
        .ok_or_else(|| CatalogError::Validation("product has no regular price".into()))?;
    let adjust_regular = matches!(apply_to, ApplyTo::Regular | ApplyTo::Both);
    let adjust_sale = matches!(apply_to, ApplyTo::Sale | ApplyTo::Both);

    if apply_to == ApplyTo::Sale && current.sale.is_none() {
        return Err(CatalogError::Validation("product has no sale price".into()));
    }

    let new_regular = if adjust_regular {
        adjust_by_percentage(regular, percentage)
    } else {
        regular
    };
    let new_sale = match current.sale {
        Some(sale) if adjust_sale => Some(adjust_by_percentage(sale, percentage)),
        other => other,
    };
    Ok((new_regular, new_sale))
}

async fn current_prices(
    conn: &mut MySqlConnection,
    tables: &Tables,
    id: ProductId,
) -> Result<PriceSet, CatalogError> {
    let post = id.as_post();
    let regular = meta::get(&mut *conn, tables, post, "_regular_price").await?;
    let sale = meta::get(&mut *conn, tables, post, "_sale_price").await?;
    let active = meta::get(conn, tables, post, "_price").await?;
    Ok(PriceSet {
        regular: decimal_meta(regular.as_deref()),
        sale: decimal_meta(sale.as_deref()),
        active: decimal_meta(active.as_deref()),
    })
}

/// Price service.
pub struct PriceService<'a> {
    pool: &'a MySqlPool,
    tables: &'a Tables,
    uploads_base: &'a str,
}

impl<'a> PriceService<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, tables: &'a Tables, uploads_base: &'a str) -> Self {
        Self {
            pool,
            tables,
            uploads_base,
        }
    }

    const fn products(&self) -> ProductRepository<'a> {
        ProductRepository::new(self.pool, self.tables, self.uploads_base)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<ProductListing>, u64), CatalogError> {
        Ok(self.products().price_list(search, page).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn stats(&self) -> Result<PriceStats, CatalogError> {
        Ok(self.products().price_stats().await?)
    }

    /// Set regular and sale price; `_price` follows the sale price when
    /// there is one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid amounts,
    /// `CatalogError::ProductNotFound` for unknown products.
    #[tracing::instrument(skip(self, actor, reason), fields(user = %actor.username))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        product_id: ProductId,
        regular: Decimal,
        sale: Option<Decimal>,
        reason: &str,
    ) -> Result<PriceUpdate, CatalogError> {
        validate_prices(regular, sale)?;
        self.apply(actor, product_id, reason, |_| Ok((regular, sale)))
            .await
    }

    /// Apply a batch; each item is validated and written on its own.
    pub async fn update_multiple(
        &self,
        actor: &CurrentUser,
        change: &BulkPriceChange,
        reason: &str,
    ) -> BatchOutcome<PriceUpdate> {
        let mut outcome = BatchOutcome::default();
        match change {
            BulkPriceChange::Percentage {
                products,
                percentage,
                apply_to,
            } => {
                for &id in products {
                    let result = if *percentage <= -Decimal::ONE_HUNDRED {
                        Err(CatalogError::Validation(
                            "percentage must be greater than -100".into(),
                        ))
                    } else {
                        self.apply(actor, id, reason, |current| {
                            let (regular, sale) =
                                percentage_target(current, *percentage, *apply_to)?;
                            validate_prices(regular, sale)?;
                            Ok((regular, sale))
                        })
                        .await
                    };
                    outcome.push(id, result);
                }
            }
            BulkPriceChange::Fixed { products } => {
                for item in products {
                    let result = self
                        .update(actor, item.id, item.regular_price, item.sale_price, reason)
                        .await;
                    outcome.push(item.id, result);
                }
            }
            BulkPriceChange::RemoveSale { products } => {
                for &id in products {
                    let result = self
                        .apply(actor, id, reason, |current| {
                            let regular = current.regular.ok_or_else(|| {
                                CatalogError::Validation("product has no regular price".into())
                            })?;
                            Ok((regular, None))
                        })
                        .await;
                    outcome.push(id, result);
                }
            }
        }
        outcome
    }

    /// Read current prices, compute the new pair, write and audit it.
    async fn apply<F>(
        &self,
        actor: &CurrentUser,
        product_id: ProductId,
        reason: &str,
        compute: F,
    ) -> Result<PriceUpdate, CatalogError>
    where
        F: FnOnce(PriceSet) -> Result<(Decimal, Option<Decimal>), CatalogError>,
    {
        let mut tx = self.pool.begin().await?;
        let target = load_target(&mut *tx, self.tables, product_id).await?;
        let old = current_prices(&mut *tx, self.tables, product_id).await?;

        let (regular, sale) = compute(old)?;
        let new = PriceSet {
            regular: Some(regular),
            sale,
            active: Some(sale.unwrap_or(regular)),
        };
        if new == old {
            return Ok(PriceUpdate {
                product_id,
                old,
                new,
                changed: false,
            });
        }

        products::write_prices(&mut *tx, self.tables, product_id.as_post(), regular, sale).await?;
        tx.commit().await?;

        let entry = NewPriceHistory {
            product_id,
            product_title: Some(&target.header.title),
            sku: target.sku.as_deref(),
            old,
            new,
            changed_by: actor.audit_name(),
            reason,
        };
        if let Err(e) = PriceHistoryRepository::new(self.pool, self.tables)
            .record(&entry)
            .await
        {
            tracing::warn!(error = %e, product_id = %product_id, "failed to record price history");
        }

        tracing::info!(product_id = %product_id, %regular, ?sale, "prices updated");
        Ok(PriceUpdate {
            product_id,
            old,
            new,
            changed: true,
        })
    }

    /// Latest history rows for a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn history(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<PriceHistoryEntry>, CatalogError> {
        Ok(PriceHistoryRepository::new(self.pool, self.tables)
            .for_product(product_id, HISTORY_LIMIT)
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_validate_prices() {
        assert!(validate_prices(d("59.90"), None).is_ok());
        assert!(validate_prices(d("59.90"), Some(d("0"))).is_ok());
        assert!(validate_prices(d("0"), None).is_err());
        assert!(validate_prices(d("59.90"), Some(d("59.90"))).is_err());
        assert!(validate_prices(d("59.90"), Some(d("-1"))).is_err());
    }

    #[test]
    fn test_percentage_rounds_half_even() {
        assert_eq!(adjust_by_percentage(d("10.05"), d("10")), d("11.06"));
        // 0.125 goes to the even cent, not up
        assert_eq!(adjust_by_percentage(d("0.25"), d("-50")), d("0.12"));
        assert_eq!(adjust_by_percentage(d("100"), d("-15")), d("85.00"));
    }

    #[test]
    fn test_percentage_target_modes() {
        let current = PriceSet {
            regular: Some(d("100")),
            sale: Some(d("80")),
            active: Some(d("80")),
        };
        assert_eq!(
            percentage_target(current, d("10"), ApplyTo::Regular).unwrap(),
            (d("110.00"), Some(d("80")))
        );
        assert_eq!(
            percentage_target(current, d("10"), ApplyTo::Sale).unwrap(),
            (d("100"), Some(d("88.00")))
        );
        assert_eq!(
            percentage_target(current, d("10"), ApplyTo::Both).unwrap(),
            (d("110.00"), Some(d("88.00")))
        );

        let no_sale = PriceSet {
            sale: None,
            ..current
        };
        assert!(percentage_target(no_sale, d("10"), ApplyTo::Sale).is_err());
    }

    #[test]
    fn test_bulk_payload_modes() {
        let change: BulkPriceChange = serde_json::from_value(serde_json::json!({
            "mode": "percentage",
            "products": [1, 2],
            "percentage": "5",
            "apply_to": "both"
        }))
        .unwrap();
        assert!(matches!(
            change,
            BulkPriceChange::Percentage { apply_to: ApplyTo::Both, .. }
        ));

        let change: BulkPriceChange = serde_json::from_value(serde_json::json!({
            "mode": "remove_sale",
            "products": [3]
        }))
        .unwrap();
        assert!(matches!(change, BulkPriceChange::RemoveSale { products } if products.len() == 1));
    }
}
