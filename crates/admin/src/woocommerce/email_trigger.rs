//! Order e-mail trigger.
//!
//! WooCommerce only sends its "new order" and "processing order" e-mails on
//! a status transition it performs itself. Orders written straight to the
//! database never pass through that code, so the trigger moves each new
//! order to `pending` and then to `processing` through the REST API.
//!
//! Both updates repeat the payment method; a partial update without it
//! clears the field on the stored order.
//!
//! Delivery is driven by the `woo_email_outbox` row written with the order:
//! [`spawn_delivery`] runs right after commit, [`redispatch_stale`] picks up
//! rows left `pending` by a crash, and [`replay_failed`] retries failures.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::MySqlPool;

use woo_backoffice_core::{OrderId, OutboxId};

use super::WooCommerceError;
use crate::db::{EmailOutboxRepository, OutboxEntry, RepositoryError};

/// Body of a `PUT /orders/{id}` status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub set_paid: bool,
    pub payment_method: String,
    pub payment_method_title: String,
}

/// Something that can apply a status update to a remote order.
pub trait OrderTransport: Send + Sync {
    fn update_order(
        &self,
        id: OrderId,
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<(), WooCommerceError>> + Send;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Wait before the first retry; doubles for each further one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based): 2 s, 4 s, 8 s by default.
    #[must_use]
    pub fn delay_before(&self, retry: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// One order whose e-mails should be triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailJob {
    pub outbox_id: OutboxId,
    pub order_id: OrderId,
    pub order_number: String,
    pub payment_method: String,
    pub payment_method_title: String,
}

impl From<OutboxEntry> for EmailJob {
    fn from(entry: OutboxEntry) -> Self {
        Self {
            outbox_id: entry.id,
            order_id: entry.order_id,
            order_number: entry.order_number,
            payment_method: entry.payment_method,
            payment_method_title: entry.payment_method_title,
        }
    }
}

/// Result of one trigger run.
#[derive(Debug)]
pub struct TriggerReport {
    /// Requests sent across both transitions.
    pub attempts: u32,
    pub result: Result<(), WooCommerceError>,
}

/// Runs the pending → processing transition pair.
#[derive(Debug)]
pub struct EmailTrigger<T> {
    transport: T,
    policy: RetryPolicy,
    /// Pause between the two transitions.
    step_delay: Duration,
}

impl<T: OrderTransport> EmailTrigger<T> {
    #[must_use]
    pub const fn new(transport: T, policy: RetryPolicy, step_delay: Duration) -> Self {
        Self {
            transport,
            policy,
            step_delay,
        }
    }

    /// Move the order to pending, wait, then to processing with `set_paid`.
    #[tracing::instrument(
        skip(self, job),
        fields(order_id = %job.order_id, order_number = %job.order_number)
    )]
    pub async fn run(&self, job: &EmailJob) -> TriggerReport {
        let pending = StatusUpdate {
            status: "pending",
            set_paid: false,
            payment_method: job.payment_method.clone(),
            payment_method_title: job.payment_method_title.clone(),
        };
        let (mut attempts, result) = self.send(job.order_id, &pending).await;
        if let Err(e) = result {
            return TriggerReport {
                attempts,
                result: Err(e),
            };
        }

        tokio::time::sleep(self.step_delay).await;

        let processing = StatusUpdate {
            status: "processing",
            set_paid: true,
            ..pending
        };
        let (more, result) = self.send(job.order_id, &processing).await;
        attempts += more;
        TriggerReport { attempts, result }
    }

    /// One status update with retries; returns requests sent and the outcome.
    async fn send(
        &self,
        id: OrderId,
        update: &StatusUpdate,
    ) -> (u32, Result<(), WooCommerceError>) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.update_order(id, update).await {
                Ok(()) => return (attempt, Ok(())),
                Err(e) if e.is_retryable() && attempt <= self.policy.retries => {
                    let delay = self.policy.delay_before(attempt);
                    tracing::warn!(
                        error = %e,
                        status = update.status,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "order status update failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return (attempt, Err(e)),
            }
        }
    }
}

// =============================================================================
// Outbox delivery
// =============================================================================

/// Run the trigger for one outbox row and record the outcome on it.
pub async fn deliver<T: OrderTransport>(
    pool: &MySqlPool,
    trigger: &EmailTrigger<T>,
    job: &EmailJob,
) -> bool {
    let report = trigger.run(job).await;
    let outbox = EmailOutboxRepository::new(pool);

    let recorded = match &report.result {
        Ok(()) => {
            tracing::info!(
                order_id = %job.order_id,
                order_number = %job.order_number,
                attempts = report.attempts,
                "order e-mails triggered"
            );
            outbox.mark_sent(job.outbox_id, report.attempts).await
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                order_id = %job.order_id,
                order_number = %job.order_number,
                attempts = report.attempts,
                "order e-mail trigger failed"
            );
            outbox
                .mark_failed(job.outbox_id, report.attempts, &e.to_string())
                .await
        }
    };
    if let Err(e) = recorded {
        tracing::warn!(
            error = %e,
            outbox_id = %job.outbox_id,
            "failed to record e-mail trigger outcome"
        );
    }

    report.result.is_ok()
}

/// Deliver in the background; the caller never waits for it.
pub fn spawn_delivery<T>(pool: MySqlPool, trigger: Arc<EmailTrigger<T>>, job: EmailJob)
where
    T: OrderTransport + 'static,
{
    tokio::spawn(async move {
        deliver(&pool, &trigger, &job).await;
    });
}

/// Re-dispatch rows still pending after `grace`, in the background.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the rows cannot be read.
pub async fn redispatch_stale<T>(
    pool: &MySqlPool,
    trigger: &Arc<EmailTrigger<T>>,
    grace: Duration,
    limit: u32,
) -> Result<usize, RepositoryError>
where
    T: OrderTransport + 'static,
{
    let stale = EmailOutboxRepository::new(pool)
        .stale_pending(grace, limit)
        .await?;
    let count = stale.len();
    if count > 0 {
        tracing::info!(count, "re-dispatching pending order e-mail triggers");
    }
    for entry in stale {
        spawn_delivery(pool.clone(), Arc::clone(trigger), entry.into());
    }
    Ok(count)
}

/// Outcome counts of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Retry failed rows one after another, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the rows cannot be read.
pub async fn replay_failed<T: OrderTransport>(
    pool: &MySqlPool,
    trigger: &EmailTrigger<T>,
    limit: u32,
) -> Result<ReplaySummary, RepositoryError> {
    let failed = EmailOutboxRepository::new(pool).failed(limit).await?;
    let mut summary = ReplaySummary::default();
    for entry in failed {
        if deliver(pool, trigger, &entry.into()).await {
            summary.sent += 1;
        } else {
            summary.failed += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted transport: pops one result per call and records the call.
    #[derive(Default)]
    struct FakeTransport {
        script: Mutex<VecDeque<Result<(), WooCommerceError>>>,
        calls: Mutex<Vec<StatusUpdate>>,
    }

    impl FakeTransport {
        fn with(script: Vec<Result<(), WooCommerceError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::default(),
            }
        }

        fn statuses(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().iter().map(|u| u.status).collect()
        }
    }

    impl OrderTransport for FakeTransport {
        async fn update_order(
            &self,
            _id: OrderId,
            update: &StatusUpdate,
        ) -> Result<(), WooCommerceError> {
            self.calls.lock().unwrap().push(update.clone());
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn server_error() -> Result<(), WooCommerceError> {
        Err(WooCommerceError::Api {
            status: 502,
            message: "bad gateway".into(),
        })
    }

    fn job() -> EmailJob {
        EmailJob {
            outbox_id: OutboxId::new(1),
            order_id: OrderId::new(50_001),
            order_number: "W-00001".into(),
            payment_method: "cod".into(),
            payment_method_title: "Contra entrega".into(),
        }
    }

    fn trigger(transport: FakeTransport) -> EmailTrigger<FakeTransport> {
        let policy = RetryPolicy {
            retries: 3,
            base_delay: Duration::ZERO,
        };
        EmailTrigger::new(transport, policy, Duration::ZERO)
    }

    #[test]
    fn test_default_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::from_secs(2));
        assert_eq!(policy.delay_before(2), Duration::from_secs(4));
        assert_eq!(policy.delay_before(3), Duration::from_secs(8));
    }

    #[test]
    fn test_status_update_body() {
        let update = StatusUpdate {
            status: "processing",
            set_paid: true,
            payment_method: "cod".into(),
            payment_method_title: "Contra entrega".into(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["set_paid"], true);
        assert_eq!(json["payment_method"], "cod");

        let pending = StatusUpdate {
            status: "pending",
            set_paid: false,
            ..update
        };
        assert!(serde_json::to_value(&pending).unwrap().get("set_paid").is_none());
    }

    #[tokio::test]
    async fn test_happy_path_sends_pending_then_processing() {
        let trigger = trigger(FakeTransport::default());
        let report = trigger.run(&job()).await;
        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 2);
        assert_eq!(trigger.transport.statuses(), ["pending", "processing"]);
        let calls = trigger.transport.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.payment_method == "cod"));
        assert!(calls.last().unwrap().set_paid);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let transport = FakeTransport::with(vec![
            server_error(),
            Err(WooCommerceError::RateLimited { retry_after: None }),
            Ok(()),
            Ok(()),
        ]);
        let trigger = trigger(transport);
        let report = trigger.run(&job()).await;
        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 4);
        assert_eq!(
            trigger.transport.statuses(),
            ["pending", "pending", "pending", "processing"]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_three_retries() {
        let transport = FakeTransport::with(vec![
            server_error(),
            server_error(),
            server_error(),
            server_error(),
        ]);
        let trigger = trigger(transport);
        let report = trigger.run(&job()).await;
        assert!(report.result.is_err());
        assert_eq!(report.attempts, 4);
        assert_eq!(trigger.transport.statuses(), ["pending"; 4]);
    }

    #[tokio::test]
    async fn test_client_errors_stop_immediately() {
        let transport = FakeTransport::with(vec![
            Ok(()),
            Err(WooCommerceError::Api {
                status: 400,
                message: "invalid status".into(),
            }),
        ]);
        let trigger = trigger(transport);
        let report = trigger.run(&job()).await;
        assert!(matches!(
            report.result,
            Err(WooCommerceError::Api { status: 400, .. })
        ));
        assert_eq!(report.attempts, 2);
    }
}
