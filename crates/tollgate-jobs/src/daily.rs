//! The daily job.
//!
//! Runs once a day: renewal traffic rollover, node staleness sweep, daily
//! overuse scan, idle-account cleanup, per-group counter snapshots, and
//! expired class downgrades.

use rusqlite::Connection;
use tollgate_cache::SnapshotCache;
use tollgate_db::queries::{accounts, nodes};
use tollgate_ledger::overuse::{self, Window};
use tollgate_types::limits::{
    MIN_ACCOUNT_AGE_SECS, NODE_STALE_SECS, RENEWAL_PERIOD_PER_CLASS_SECS,
    SYSTEM_ACCOUNT_MAX_ID, UNUSED_DISABLE_SECS,
};

use crate::{run_step, Result};

/// Renewal candidates processed per transaction.
const RENEWAL_BATCH: u32 = 500;

/// Highest node group swept when snapshotting daily counters.
const MAX_NODE_GROUP: u32 = 8;

/// Counts from one daily run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DailySummary {
    pub renewed: usize,
    pub nodes_hidden: usize,
    pub overuse_disabled: usize,
    pub unused_disabled: usize,
    pub snapshotted: usize,
    pub classes_downgraded: usize,
}

/// Run the daily job. `quota_per_class` is the traffic grant in bytes per
/// service class on renewal. Step failures are logged and skipped.
pub fn run(
    conn: &mut Connection,
    cache: &SnapshotCache,
    quota_per_class: u64,
    now: u64,
) -> DailySummary {
    tracing::info!("daily job started");

    let summary = DailySummary {
        renewed: run_step(
            "daily",
            "renewal_rollover",
            renewal_rollover(conn, quota_per_class, now),
        ),
        nodes_hidden: run_step("daily", "hide_stale_nodes", hide_stale_nodes(conn, now)),
        overuse_disabled: run_step(
            "daily",
            "overuse_scan",
            overuse::scan(conn, cache, Window::Daily, now)
                .map(|s| s.disabled)
                .map_err(Into::into),
        ),
        unused_disabled: run_step("daily", "disable_unused", disable_unused(conn, now)),
        snapshotted: run_step("daily", "snapshot_counters", snapshot_counters(conn, now)),
        classes_downgraded: run_step(
            "daily",
            "downgrade_expired_class",
            accounts::downgrade_expired_class(conn, now).map_err(Into::into),
        ),
    };

    tracing::info!(?summary, "daily job complete");
    summary
}

/// Roll traffic for accounts whose renewal came due: fold downloads into
/// uploads, zero downloads, and grant the class-scaled daily quota and
/// renewal period.
fn renewal_rollover(conn: &mut Connection, quota_per_class: u64, now: u64) -> Result<usize> {
    let mut renewed = 0usize;
    let mut after_id = 0i64;

    loop {
        let batch = accounts::renewal_due(conn, now, after_id, RENEWAL_BATCH)?;
        if batch.is_empty() {
            break;
        }
        after_id = batch[batch.len() - 1].id;

        let tx = conn.transaction()?;
        for due in &batch {
            let class = u64::from(due.service_class);
            let quota = class * quota_per_class;
            let next_due = now + class * RENEWAL_PERIOD_PER_CLASS_SECS;
            match accounts::roll_renewal(&tx, due.id, quota, next_due) {
                Ok(()) => renewed += 1,
                Err(e) => {
                    tracing::warn!(account_id = due.id, error = %e, "renewal rollover failed, skipped");
                }
            }
        }
        tx.commit()?;
    }

    Ok(renewed)
}

/// Hide nodes whose heartbeat went stale.
fn hide_stale_nodes(conn: &Connection, now: u64) -> Result<usize> {
    let cutoff = now.saturating_sub(NODE_STALE_SECS);
    Ok(nodes::hide_stale(conn, cutoff)?)
}

/// Disable paid accounts idle for too long, sparing young accounts and
/// system accounts.
fn disable_unused(conn: &Connection, now: u64) -> Result<usize> {
    let idle_before = now.saturating_sub(UNUSED_DISABLE_SECS);
    let registered_before = now.saturating_sub(MIN_ACCOUNT_AGE_SECS);
    let warning = format!(
        "{now}: account idle for over a month; protection engaged, \
         sign in to lift it"
    );
    Ok(accounts::disable_unused(
        conn,
        idle_before,
        registered_before,
        SYSTEM_ACCOUNT_MAX_ID,
        &warning,
    )?)
}

/// Snapshot daily counters for active paid accounts, one group at a time
/// to bound the per-statement row count.
fn snapshot_counters(conn: &Connection, now: u64) -> Result<usize> {
    // Accounts untouched for two days have nothing new to snapshot.
    let active_since = now.saturating_sub(2 * tollgate_types::DAY_SECS);
    let mut total = 0usize;
    for group in 1..=MAX_NODE_GROUP {
        let count = accounts::snapshot_daily_counters(conn, group, active_since)?;
        if count > 0 {
            tracing::debug!(group, count, "daily counters snapshotted");
        }
        total += count;
    }
    Ok(total)
}
