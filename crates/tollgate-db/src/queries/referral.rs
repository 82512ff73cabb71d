//! Referral ledger query functions.
//!
//! The ledger is append-only apart from the single allowed flip of an
//! entry's `recovered` flag.

use rusqlite::{Connection, OptionalExtension};
use tollgate_types::{ReferralEntry, ReferralKind};

use crate::{DbError, Result};

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReferralEntry> {
    let kind_raw: String = row.get(4)?;
    Ok(ReferralEntry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        referrer_id: row.get(2)?,
        order_id: row.get(3)?,
        kind: ReferralKind::from_str(&kind_raw).unwrap_or(ReferralKind::Commission),
        amount: row.get(5)?,
        recovered: row.get::<_, i64>(6)? != 0,
        recorded_at: row.get::<_, i64>(7)? as u64,
    })
}

const ENTRY_COLUMNS: &str =
    "id, account_id, referrer_id, order_id, kind, amount, recovered, recorded_at";

/// Append a ledger entry and return its id.
pub fn insert_entry(
    conn: &Connection,
    account_id: i64,
    referrer_id: i64,
    order_id: Option<i64>,
    kind: ReferralKind,
    amount_cents: i64,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO referral_ledger (account_id, referrer_id, order_id, kind, amount, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            account_id,
            referrer_id,
            order_id,
            kind.as_str(),
            amount_cents,
            now as i64
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Whether a commission entry already exists for this settlement order.
pub fn commission_exists_for_order(conn: &Connection, order_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM referral_ledger WHERE kind = 'commission' AND order_id = ?1",
        [order_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Find the signup-bonus entry for an account, if any.
pub fn signup_bonus(conn: &Connection, account_id: i64) -> Result<Option<ReferralEntry>> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM referral_ledger
                 WHERE account_id = ?1 AND kind = 'signup_bonus'
                 ORDER BY id LIMIT 1"
            ),
            [account_id],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Whether a recovery entry exists for this (account, referrer) pair.
pub fn recovery_exists(conn: &Connection, account_id: i64, referrer_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM referral_ledger
         WHERE account_id = ?1 AND referrer_id = ?2 AND kind = 'recovery'",
        rusqlite::params![account_id, referrer_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Flip an entry's `recovered` flag, exactly once.
pub fn mark_recovered(conn: &Connection, entry_id: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE referral_ledger SET recovered = 1 WHERE id = ?1 AND recovered = 0",
        [entry_id],
    )?;
    if updated == 0 {
        return Err(DbError::Constraint(format!(
            "ledger entry {entry_id} missing or already recovered"
        )));
    }
    Ok(())
}

/// List all ledger entries for an account, oldest first.
pub fn entries_for_account(conn: &Connection, account_id: i64) -> Result<Vec<ReferralEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM referral_ledger WHERE account_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([account_id], row_to_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
