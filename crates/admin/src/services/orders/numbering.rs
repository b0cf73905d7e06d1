//! Order-number allocation.
//!
//! The counter lives in one `options` row, locked with `SELECT ... FOR
//! UPDATE` for the rest of the order transaction. A rollback also rolls the
//! counter back, so numbers are issued without gaps or repeats.

use sqlx::MySqlConnection;

use woo_backoffice_core::OrderNumber;
use woo_backoffice_core::order_number::parse_counter;

use super::OrderError;
use crate::db::Tables;
use crate::db::options::{self, ORDER_COUNTER_OPTION};

/// Issue the next order number inside the caller's transaction.
///
/// # Errors
///
/// Returns `OrderError::Number` if the stored counter is corrupt or the
/// prefix is invalid, `OrderError::Repository` if a query fails.
pub async fn allocate(
    conn: &mut MySqlConnection,
    tables: &Tables,
    prefix: &str,
) -> Result<OrderNumber, OrderError> {
    let stored = options::lock_counter(&mut *conn, tables, ORDER_COUNTER_OPTION).await?;
    let next = next_sequence(stored.as_deref())?;
    let number = OrderNumber::format(prefix, next)?;
    options::store_counter(conn, tables, ORDER_COUNTER_OPTION, next).await?;
    Ok(number)
}

/// The sequence value following the stored counter.
fn next_sequence(stored: Option<&str>) -> Result<u64, OrderError> {
    let current = parse_counter(stored)?;
    current
        .checked_add(1)
        .ok_or_else(|| OrderError::Validation("order number counter exhausted".into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_from_empty_counter() {
        let mut stored: Option<String> = None;
        let mut issued = Vec::new();
        for _ in 0..3 {
            let next = next_sequence(stored.as_deref()).unwrap();
            issued.push(OrderNumber::format("W", next).unwrap().into_inner());
            stored = Some(next.to_string());
        }
        assert_eq!(issued, ["W-00001", "W-00002", "W-00003"]);
    }

    #[test]
    fn test_corrupt_counter_is_refused() {
        assert!(matches!(
            next_sequence(Some("abc")),
            Err(OrderError::Number(_))
        ));
    }
}
