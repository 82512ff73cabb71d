//! Account query functions.
//!
//! Traffic and balance mutations here are relative updates
//! (`col = col + ?`); concurrent callers interleave safely in any order.

use rusqlite::{Connection, OptionalExtension};
use tollgate_types::Account;

use crate::{DbError, Result};

const ACCOUNT_COLUMNS: &str = "id, email, uploaded, downloaded, quota_total, quota_daily_limit,
     last_day_downloaded, sub_count, sub_count_lastday, last_active_at,
     renewal_due_at, service_class, class_expires_at, account_expires_at,
     node_group, enabled, warning_message, ban_count, score, referrer_id,
     balance, registered_at";

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        uploaded: row.get::<_, i64>(2)? as u64,
        downloaded: row.get::<_, i64>(3)? as u64,
        quota_total: row.get::<_, i64>(4)? as u64,
        quota_daily_limit: row.get::<_, i64>(5)? as u64,
        last_day_downloaded: row.get::<_, i64>(6)? as u64,
        sub_count: row.get::<_, i64>(7)? as u64,
        sub_count_lastday: row.get::<_, i64>(8)? as u64,
        last_active_at: row.get::<_, i64>(9)? as u64,
        renewal_due_at: row.get::<_, i64>(10)? as u64,
        service_class: row.get::<_, i64>(11)? as u32,
        class_expires_at: row.get::<_, i64>(12)? as u64,
        account_expires_at: row.get::<_, i64>(13)? as u64,
        node_group: row.get::<_, i64>(14)? as u32,
        enabled: row.get::<_, i64>(15)? != 0,
        warning_message: row.get(16)?,
        ban_count: row.get::<_, i64>(17)? as u32,
        score: row.get(18)?,
        referrer_id: row.get(19)?,
        balance: row.get(20)?,
        registered_at: row.get::<_, i64>(21)? as u64,
    })
}

/// Fetch one account.
pub fn get(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        [id],
        row_to_account,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("account {id}")))
}

/// Insert an account with an explicit id.
pub fn insert(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, email, uploaded, downloaded, quota_total,
             quota_daily_limit, last_day_downloaded, sub_count, sub_count_lastday,
             last_active_at, renewal_due_at, service_class, class_expires_at,
             account_expires_at, node_group, enabled, warning_message, ban_count,
             score, referrer_id, balance, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
             ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        rusqlite::params![
            account.id,
            account.email,
            account.uploaded as i64,
            account.downloaded as i64,
            account.quota_total as i64,
            account.quota_daily_limit as i64,
            account.last_day_downloaded as i64,
            account.sub_count as i64,
            account.sub_count_lastday as i64,
            account.last_active_at as i64,
            account.renewal_due_at as i64,
            account.service_class as i64,
            account.class_expires_at as i64,
            account.account_expires_at as i64,
            account.node_group as i64,
            account.enabled as i64,
            account.warning_message,
            account.ban_count as i64,
            account.score,
            account.referrer_id,
            account.balance,
            account.registered_at as i64,
        ],
    )?;
    Ok(())
}

/// Atomically add a traffic delta to an account and bump its activity
/// timestamp. Returns `false` when the account does not exist.
pub fn apply_traffic_delta(
    conn: &Connection,
    id: i64,
    upload_bytes: u64,
    download_bytes: u64,
    now: u64,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts
         SET uploaded = uploaded + ?1,
             downloaded = downloaded + ?2,
             last_active_at = ?3
         WHERE id = ?4",
        rusqlite::params![upload_bytes as i64, download_bytes as i64, now as i64, id],
    )?;
    Ok(updated == 1)
}

/// Atomically credit (or debit, with a negative amount) an account balance.
pub fn credit_balance(conn: &Connection, id: i64, amount_cents: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts SET balance = balance + ?1 WHERE id = ?2",
        rusqlite::params![amount_cents, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {id}")));
    }
    Ok(())
}

/// Disable an account and attach a warning message.
pub fn disable_with_warning(conn: &Connection, id: i64, warning: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts SET enabled = 0, warning_message = ?1 WHERE id = ?2",
        rusqlite::params![warning, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {id}")));
    }
    Ok(())
}

/// A renewal candidate: enabled paid account whose quota period elapsed.
#[derive(Debug)]
pub struct RenewalDue {
    pub id: i64,
    pub service_class: u32,
}

/// List accounts due for the daily traffic rollover, keyset-paginated.
pub fn renewal_due(
    conn: &Connection,
    now: u64,
    after_id: i64,
    limit: u32,
) -> Result<Vec<RenewalDue>> {
    let mut stmt = conn.prepare(
        "SELECT id, service_class FROM accounts
         WHERE enabled = 1 AND service_class > 0 AND renewal_due_at < ?1 AND id > ?2
         ORDER BY id LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![now as i64, after_id, limit],
            |row| {
                Ok(RenewalDue {
                    id: row.get(0)?,
                    service_class: row.get::<_, i64>(1)? as u32,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Apply the daily rollover to one account: fold downloads into the
/// lifetime upload counter, zero downloads, and schedule the next renewal.
pub fn roll_renewal(
    conn: &Connection,
    id: i64,
    quota_daily_limit: u64,
    renewal_due_at: u64,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts
         SET uploaded = uploaded + downloaded,
             downloaded = 0,
             quota_daily_limit = ?1,
             renewal_due_at = ?2
         WHERE id = ?3",
        rusqlite::params![quota_daily_limit as i64, renewal_due_at as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {id}")));
    }
    Ok(())
}

/// Traffic totals for one account inside a group scan.
#[derive(Debug)]
pub struct AccountUsage {
    pub id: i64,
    pub uploaded: u64,
    pub downloaded: u64,
}

impl AccountUsage {
    pub fn total(&self) -> u64 {
        self.uploaded.saturating_add(self.downloaded)
    }
}

/// List enabled accounts in a group that were active after `active_since`,
/// keyset-paginated for bounded batches.
pub fn group_active_accounts(
    conn: &Connection,
    node_group: u32,
    active_since: u64,
    after_id: i64,
    limit: u32,
) -> Result<Vec<AccountUsage>> {
    let mut stmt = conn.prepare(
        "SELECT id, uploaded, downloaded FROM accounts
         WHERE enabled = 1 AND node_group = ?1 AND last_active_at > ?2 AND id > ?3
         ORDER BY id LIMIT ?4",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![node_group as i64, active_since as i64, after_id, limit],
            |row| {
                Ok(AccountUsage {
                    id: row.get(0)?,
                    uploaded: row.get::<_, i64>(1)? as u64,
                    downloaded: row.get::<_, i64>(2)? as u64,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Disable enabled paid accounts idle since before `idle_before`, skipping
/// young accounts and system accounts. Returns the number disabled.
pub fn disable_unused(
    conn: &Connection,
    idle_before: u64,
    registered_before: u64,
    system_max_id: i64,
    warning: &str,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE accounts
         SET enabled = 0, warning_message = ?1
         WHERE id > ?2 AND enabled = 1 AND service_class > 0
           AND last_active_at < ?3 AND registered_at < ?4",
        rusqlite::params![
            warning,
            system_max_id,
            idle_before as i64,
            registered_before as i64
        ],
    )?;
    Ok(updated)
}

/// Snapshot daily counters for active paid accounts in one group. Returns
/// the number of accounts snapshotted.
pub fn snapshot_daily_counters(
    conn: &Connection,
    node_group: u32,
    active_since: u64,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE accounts
         SET last_day_downloaded = downloaded,
             sub_count_lastday = sub_count
         WHERE enabled = 1 AND service_class > 0
           AND node_group = ?1 AND last_active_at > ?2",
        rusqlite::params![node_group as i64, active_since as i64],
    )?;
    Ok(updated)
}

/// Downgrade expired paid classes to 0. Returns the number downgraded.
pub fn downgrade_expired_class(conn: &Connection, now: u64) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE accounts SET service_class = 0
         WHERE service_class > 0 AND class_expires_at < ?1",
        [now as i64],
    )?;
    Ok(updated)
}

/// Accounts matching the never-used predicate: zero lifetime traffic and
/// activity, old enough, free tier, negligible balance.
pub fn never_used_candidates(
    conn: &Connection,
    registered_before: u64,
    balance_max_cents: i64,
) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM accounts
         WHERE enabled = 1 AND uploaded = 0 AND downloaded = 0
           AND last_active_at = 0 AND service_class = 0
           AND registered_at < ?1 AND balance <= ?2
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![registered_before as i64, balance_max_cents],
            |row| row.get(0),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// An enabled account carrying a negative balance.
#[derive(Debug)]
pub struct NegativeBalance {
    pub id: i64,
    pub service_class: u32,
    pub node_group: u32,
}

/// List enabled accounts with a negative balance.
pub fn negative_balance_accounts(conn: &Connection) -> Result<Vec<NegativeBalance>> {
    let mut stmt = conn.prepare(
        "SELECT id, service_class, node_group FROM accounts
         WHERE enabled = 1 AND balance < 0 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(NegativeBalance {
                id: row.get(0)?,
                service_class: row.get::<_, i64>(1)? as u32,
                node_group: row.get::<_, i64>(2)? as u32,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Apply the negative-balance penalty: disable, charge the ban counter by
/// the current class, dock one score point, and drop one node group when
/// above group 1. One statement, so the penalty lands whole or not at all.
pub fn apply_negative_balance_penalty(
    conn: &Connection,
    id: i64,
    warning: &str,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE accounts
         SET enabled = 0,
             warning_message = ?1,
             ban_count = ban_count + service_class,
             score = score - 1,
             node_group = CASE WHEN node_group > 1 THEN node_group - 1 ELSE node_group END
         WHERE id = ?2",
        rusqlite::params![warning, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("account {id}")));
    }
    Ok(())
}
