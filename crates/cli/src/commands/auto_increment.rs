//! HPOS orders counter maintenance.

use woo_backoffice_admin::db::OrderRepository;
use woo_backoffice_admin::services::orders::ensure_headroom;
use woo_backoffice_core::next_auto_increment;

use super::{CommandError, connect};

/// Raise the orders `AUTO_INCREMENT` to `max(posts.ID, orders.id) + 1` when
/// it lags behind. With `dry_run` only the decision is logged.
///
/// # Errors
///
/// Returns `CommandError` if the counters cannot be read or written.
pub async fn sync(dry_run: bool) -> Result<(), CommandError> {
    let (config, pool) = connect().await?;
    let orders = OrderRepository::new(&pool, &config.tables);

    if dry_run {
        let highest = orders.highest_shared_id().await?;
        let current = orders.orders_auto_increment().await?;
        match next_auto_increment(highest, current) {
            Some(raised) => tracing::info!(
                current,
                ?highest,
                would_raise_to = raised,
                "orders auto-increment is behind (dry run, nothing changed)"
            ),
            None => tracing::info!(current, ?highest, "orders auto-increment already ahead"),
        }
        return Ok(());
    }

    match ensure_headroom(&orders).await? {
        Some(raised) => tracing::info!(raised_to = raised, "orders auto-increment raised"),
        None => tracing::info!("orders auto-increment already ahead, nothing to do"),
    }
    Ok(())
}
