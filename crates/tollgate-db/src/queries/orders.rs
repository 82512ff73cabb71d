//! Payment order query functions.

use rusqlite::{Connection, OptionalExtension};
use tollgate_types::{Order, OrderStatus};

use crate::{DbError, Result};

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let status_raw: i64 = row.get(3)?;
    Ok(Order {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        status: OrderStatus::from_i64(status_raw).unwrap_or(OrderStatus::Unpaid),
        trade_no: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
    })
}

/// Insert an unpaid order and return its id.
pub fn insert(
    conn: &Connection,
    account_id: i64,
    amount_cents: i64,
    trade_no: &str,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO orders (account_id, amount, status, trade_no, created_at)
         VALUES (?1, ?2, 0, ?3, ?4)",
        rusqlite::params![account_id, amount_cents, trade_no, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch one order.
pub fn get(conn: &Connection, id: i64) -> Result<Order> {
    conn.query_row(
        "SELECT id, account_id, amount, status, trade_no, created_at
         FROM orders WHERE id = ?1",
        [id],
        row_to_order,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("order {id}")))
}

/// Mark an unpaid order as paid, recording the gateway trade number.
/// Returns `false` when the order was already paid.
pub fn mark_paid(conn: &Connection, id: i64, trade_no: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE orders SET status = 1, trade_no = ?1 WHERE id = ?2 AND status = 0",
        rusqlite::params![trade_no, id],
    )?;
    Ok(updated == 1)
}

/// Delete unpaid orders created before `cutoff`. Returns the number deleted.
pub fn delete_stale_unpaid(conn: &Connection, cutoff: u64) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM orders WHERE status = 0 AND created_at < ?1",
        [cutoff as i64],
    )?;
    Ok(deleted)
}
