//! Stock decrement for the lines of a new order.
//!
//! Runs inside the order transaction. Each line's `_stock` is reduced and
//! floored at zero, and the change is appended to stock history with the
//! reason `Pedido {order_number}`. Lines without stock tracking are skipped,
//! as are lines whose stored stock cannot be read.

use sqlx::MySqlConnection;

use woo_backoffice_core::{StockDecrement, StockOutcome};

use crate::db::{RepositoryError, Tables, history, meta, products};
use crate::models::{NewStockHistory, OrderLine, OrderRecord};

/// Reason written to stock history for an order.
#[must_use]
pub fn history_reason(order_number: &str) -> String {
    format!("Pedido {order_number}")
}

/// Decrement stock for every line. Returns the applied decrements.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if reading or writing stock fails.
/// History failures are logged and do not fail the order.
pub async fn decrement(
    conn: &mut MySqlConnection,
    tables: &Tables,
    record: &OrderRecord,
) -> Result<Vec<StockDecrement>, RepositoryError> {
    let reason = history_reason(record.number.as_str());
    let mut applied = Vec::with_capacity(record.lines.len());

    for line in &record.lines {
        let target = line.stock_target();
        let stored = meta::get(&mut *conn, tables, target.as_post(), "_stock").await?;

        match StockOutcome::apply(stored.as_deref(), line.quantity) {
            StockOutcome::NotTracked => {}
            StockOutcome::Unparseable(raw) => {
                tracing::warn!(
                    product_id = %target,
                    stock = %raw,
                    order_number = %record.number,
                    "unparseable stock value, skipping decrement"
                );
            }
            StockOutcome::Decrement(change) => {
                if change.floored {
                    tracing::warn!(
                        product_id = %target,
                        previous = change.previous,
                        quantity = change.quantity,
                        order_number = %record.number,
                        "order exceeds available stock, flooring at zero"
                    );
                }
                products::write_stock(&mut *conn, tables, target.as_post(), change.new_stock)
                    .await?;
                record_history(&mut *conn, tables, record, line, &change, &reason).await;
                applied.push(change);
            }
        }
    }
    Ok(applied)
}

async fn record_history(
    conn: &mut MySqlConnection,
    tables: &Tables,
    record: &OrderRecord,
    line: &OrderLine,
    change: &StockDecrement,
    reason: &str,
) {
    let entry = NewStockHistory {
        product_id: line.stock_target(),
        product_title: Some(&line.name),
        sku: line.sku.as_deref(),
        old_stock: change.previous,
        new_stock: change.new_stock,
        changed_by: &record.created_by,
        reason,
    };
    if let Err(e) = history::insert_stock(conn, tables, &entry).await {
        tracing::warn!(
            error = %e,
            product_id = %line.stock_target(),
            "failed to record stock history"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_reason() {
        assert_eq!(history_reason("W-00042"), "Pedido W-00042");
    }
}
