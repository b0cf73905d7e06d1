//! Order e-mail outbox (`woo_email_outbox`).
//!
//! A row is written in the same transaction as the order, so a committed
//! order always has a pending trigger even if the process dies before the
//! background task runs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{MySqlConnection, MySqlPool};

use woo_backoffice_core::{OrderId, OutboxId};

use super::RepositoryError;

/// Delivery state of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// One pending or completed e-mail trigger.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxEntry {
    pub id: OutboxId,
    pub order_id: OrderId,
    pub order_number: String,
    pub payment_method: String,
    pub payment_method_title: String,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: u64,
    order_id: u64,
    order_number: String,
    payment_method: String,
    payment_method_title: String,
    status: String,
    attempts: u32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = RepositoryError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OutboxStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: OutboxId::new(row.id),
            order_id: OrderId::new(row.order_id),
            order_number: row.order_number,
            payment_method: row.payment_method,
            payment_method_title: row.payment_method_title,
            status,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const OUTBOX_COLUMNS: &str = "id, order_id, order_number, payment_method, payment_method_title, \
                              status, attempts, last_error, created_at, updated_at";

/// Queue a trigger for a new order. Runs inside the order transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn enqueue(
    conn: &mut MySqlConnection,
    order_id: OrderId,
    order_number: &str,
    payment_method: &str,
    payment_method_title: &str,
) -> Result<OutboxId, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO woo_email_outbox (order_id, order_number, payment_method, \
         payment_method_title, status) VALUES (?, ?, ?, ?, 'pending')",
    )
    .bind(order_id)
    .bind(order_number)
    .bind(payment_method)
    .bind(payment_method_title)
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::from_insert(e, "email trigger"))?;
    Ok(OutboxId::new(result.last_insert_id()))
}

/// Repository for the e-mail outbox.
pub struct EmailOutboxRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> EmailOutboxRepository<'a> {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Get one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OutboxId) -> Result<Option<OutboxEntry>, RepositoryError> {
        let row: Option<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM woo_email_outbox WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Pending rows older than `grace`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stale_pending(
        &self,
        grace: Duration,
        limit: u32,
    ) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM woo_email_outbox \
             WHERE status = 'pending' AND created_at < NOW() - INTERVAL ? SECOND \
             ORDER BY created_at LIMIT ?"
        ))
        .bind(grace.as_secs())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Failed rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn failed(&self, limit: u32) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM woo_email_outbox \
             WHERE status = 'failed' ORDER BY created_at LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a successful delivery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_sent(&self, id: OutboxId, attempts: u32) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE woo_email_outbox SET status = 'sent', attempts = attempts + ?, \
             last_error = NULL WHERE id = ?",
        )
        .bind(attempts)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record a final failure.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_failed(
        &self,
        id: OutboxId,
        attempts: u32,
        error: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE woo_email_outbox SET status = 'failed', attempts = attempts + ?, \
             last_error = ? WHERE id = ?",
        )
        .bind(attempts)
        .bind(error)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [OutboxStatus::Pending, OutboxStatus::Sent, OutboxStatus::Failed] {
            assert_eq!(status.as_str().parse::<OutboxStatus>().unwrap(), status);
        }
        assert!("queued".parse::<OutboxStatus>().is_err());
    }
}
