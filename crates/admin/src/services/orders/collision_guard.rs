//! Keep the HPOS orders counter ahead of every ID already taken.
//!
//! Runs before the order transaction: `ALTER TABLE` commits implicitly and
//! must not end up inside it. A writer slipping in between the check and the
//! insert is caught by the shadow post's primary key instead.

use woo_backoffice_core::next_auto_increment;

use crate::db::{OrderRepository, RepositoryError};

/// Raise `wc_orders`' `AUTO_INCREMENT` if it would reuse a post ID.
/// Returns the new counter value when it was raised.
///
/// # Errors
///
/// Returns `RepositoryError` if the counters cannot be read or written.
pub async fn ensure_headroom(
    orders: &OrderRepository<'_>,
) -> Result<Option<u64>, RepositoryError> {
    let highest = orders.highest_shared_id().await?;
    let current = orders.orders_auto_increment().await?;

    let Some(raised) = next_auto_increment(highest, current) else {
        tracing::debug!(current, ?highest, "orders auto-increment already ahead");
        return Ok(None);
    };
    orders.set_orders_auto_increment(raised).await?;
    tracing::info!(from = current, to = raised, "raised orders auto-increment");
    Ok(Some(raised))
}
