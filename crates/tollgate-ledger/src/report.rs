//! Node report ingestion.
//!
//! `apply_report` is the sole mutator of account traffic counters outside
//! the lifecycle jobs. It is safe to invoke concurrently from many nodes
//! because every counter mutation is a relative update; interleaving order
//! does not change the final totals.

use rusqlite::Connection;
use tollgate_cache::SnapshotCache;
use tollgate_db::queries::{accounts, logs, nodes};
use tollgate_types::limits::ONLINE_TTL_SECS;
use tollgate_types::{OnlineReport, ReportItem, ReportSummary};

use crate::{LedgerError, Result};

/// Apply a batch traffic report from one node.
///
/// Per-item failures (unknown account, log append error) are logged and
/// skipped; they never abort the batch. The node's bandwidth counter takes
/// the sum of all deltas, including those for unknown accounts, since the
/// node relayed those bytes either way.
///
/// # Errors
///
/// [`LedgerError::NodeNotFound`] when the reporting node is unregistered.
pub fn apply_report(
    conn: &Connection,
    node_id: i64,
    items: &[ReportItem],
    now: u64,
) -> Result<ReportSummary> {
    if !nodes::exists(conn, node_id)? {
        return Err(LedgerError::NodeNotFound(node_id));
    }

    let mut updated_count = 0usize;
    let mut total_bytes = 0u64;

    for item in items {
        total_bytes = total_bytes.saturating_add(item.total_bytes());

        match accounts::apply_traffic_delta(
            conn,
            item.account_id,
            item.upload_bytes,
            item.download_bytes,
            now,
        ) {
            Ok(true) => {
                updated_count += 1;
                if let Err(e) = logs::append_traffic(
                    conn,
                    item.account_id,
                    node_id,
                    item.upload_bytes,
                    item.download_bytes,
                    now,
                ) {
                    tracing::warn!(account_id = item.account_id, error = %e, "traffic log append failed");
                }
            }
            Ok(false) => {
                tracing::warn!(
                    account_id = item.account_id,
                    node_id,
                    "traffic report for unknown account, skipped"
                );
            }
            Err(e) => {
                tracing::warn!(account_id = item.account_id, error = %e, "traffic delta failed, skipped");
            }
        }
    }

    nodes::add_bandwidth(conn, node_id, total_bytes, now)?;

    tracing::debug!(node_id, updated_count, total_bytes, "traffic report applied");

    Ok(ReportSummary {
        node_id,
        updated_count,
        total_bytes,
    })
}

/// Apply an online-count/load report: persist the count and heartbeat,
/// log the sample, and mirror the short-lived values into the cache.
pub fn record_online(
    conn: &Connection,
    cache: &SnapshotCache,
    report: &OnlineReport,
    now: u64,
) -> Result<()> {
    nodes::set_online(conn, report.node_id, report.online_count, now)?;

    if let Err(e) = logs::append_online(conn, report.node_id, report.online_count, now) {
        tracing::warn!(node_id = report.node_id, error = %e, "online log append failed");
    }

    cache.put_int(
        &online_key(report.node_id),
        u64::from(report.online_count),
        ONLINE_TTL_SECS,
        now,
    );
    if let Some(load) = &report.load {
        cache.put_text(&load_key(report.node_id), load, ONLINE_TTL_SECS, now);
    }
    Ok(())
}

/// Refresh a node's heartbeat timestamp only.
pub fn record_heartbeat(conn: &Connection, node_id: i64, now: u64) -> Result<()> {
    nodes::touch_heartbeat(conn, node_id, now)?;
    Ok(())
}

/// Cache key for a node's live online count.
pub fn online_key(node_id: i64) -> String {
    format!("node:{node_id}:online")
}

/// Cache key for a node's last reported load.
pub fn load_key(node_id: i64) -> String {
    format!("node:{node_id}:load")
}
