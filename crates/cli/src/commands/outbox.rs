//! Order e-mail outbox maintenance.

use woo_backoffice_admin::woocommerce::email_trigger::replay_failed;
use woo_backoffice_admin::woocommerce::{EmailTrigger, RetryPolicy, WooCommerceClient};

use super::{CommandError, connect};

/// Re-run up to `limit` failed triggers, oldest first, one at a time.
///
/// # Errors
///
/// Returns `CommandError` if the outbox cannot be read or the client cannot
/// be built. Individual trigger failures are recorded on their rows.
pub async fn replay(limit: u32) -> Result<(), CommandError> {
    let (config, pool) = connect().await?;
    let client = WooCommerceClient::new(&config.woocommerce)?;
    let trigger = EmailTrigger::new(
        client,
        RetryPolicy::default(),
        config.orders.email_trigger_delay,
    );

    let summary = replay_failed(&pool, &trigger, limit).await?;
    tracing::info!(sent = summary.sent, failed = summary.failed, "outbox replay finished");
    Ok(())
}
