//! Writes one [`OrderRecord`] into both order storages.
//!
//! Everything runs on the caller's transaction connection; nothing here
//! commits.

use sqlx::MySqlConnection;

use woo_backoffice_core::OrderId;

use super::projection;
use crate::db::orders;
use crate::db::{RepositoryError, Tables};
use crate::models::{AddressType, OrderRecord};

/// Insert header, shadow post, addresses, operational data, both meta sets
/// and every item. Returns the new order ID.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the shadow post ID is already
/// taken, `RepositoryError::Database` if any other insert fails.
pub async fn persist(
    conn: &mut MySqlConnection,
    tables: &Tables,
    record: &OrderRecord,
    woocommerce_version: &str,
) -> Result<OrderId, RepositoryError> {
    let id = orders::insert_header(&mut *conn, tables, record).await?;
    orders::insert_shadow_post(&mut *conn, tables, id, record).await?;

    orders::insert_address(&mut *conn, tables, id, AddressType::Billing, &record.billing).await?;
    orders::insert_address(&mut *conn, tables, id, AddressType::Shipping, &record.shipping)
        .await?;
    orders::insert_operational_data(&mut *conn, tables, id, record, woocommerce_version).await?;

    orders::insert_order_meta(&mut *conn, tables, id, &projection::order_meta(record)).await?;
    orders::insert_legacy_meta(
        &mut *conn,
        tables,
        id,
        &projection::legacy_meta(record, woocommerce_version),
    )
    .await?;

    for item in projection::items(record) {
        orders::insert_item(&mut *conn, tables, id, &item.name, item.item_type, &item.meta).await?;
    }

    tracing::debug!(order_id = %id, "order rows written");
    Ok(id)
}
