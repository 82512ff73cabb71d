//! The weekly clean job.
//!
//! Trims historical per-report traffic rows and node online counts past
//! the retention window. The aggregate counters on accounts and nodes are
//! untouched; only the row-level history goes.

use rusqlite::Connection;
use tollgate_db::queries::logs;
use tollgate_types::limits::LOG_RETENTION_SECS;

/// Counts from one clean run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub traffic_rows_trimmed: usize,
    pub online_rows_trimmed: usize,
}

/// Run the clean job.
pub fn run(conn: &mut Connection, now: u64) -> CleanSummary {
    tracing::info!("clean job started");

    let cutoff = now.saturating_sub(LOG_RETENTION_SECS);
    let summary = match logs::trim(conn, cutoff) {
        Ok((traffic, online)) => CleanSummary {
            traffic_rows_trimmed: traffic,
            online_rows_trimmed: online,
        },
        Err(e) => {
            tracing::error!(job = "clean", step = "trim_logs", error = %e, "job step failed");
            CleanSummary::default()
        }
    };

    tracing::info!(?summary, "clean job complete");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_db::queries::{accounts, nodes};
    use tollgate_types::{Account, Node, DAY_SECS};

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_old_rows_trimmed_recent_kept() {
        let mut conn = tollgate_db::open_memory().expect("open test db");
        let account = Account {
            id: 1,
            email: "user1@example.com".into(),
            uploaded: 0,
            downloaded: 0,
            quota_total: 0,
            quota_daily_limit: 0,
            last_day_downloaded: 0,
            sub_count: 0,
            sub_count_lastday: 0,
            last_active_at: 0,
            renewal_due_at: 0,
            service_class: 0,
            class_expires_at: 0,
            account_expires_at: 0,
            node_group: 1,
            enabled: true,
            warning_message: None,
            ban_count: 0,
            score: 0,
            referrer_id: 0,
            balance: 0,
            registered_at: 0,
        };
        accounts::insert(&conn, &account).expect("account");
        let node = Node {
            id: 1,
            name: "edge-1".into(),
            bandwidth_used: 0,
            bandwidth_limit: 0,
            last_heartbeat_at: NOW,
            online_count: 0,
            visible: true,
            node_group: 1,
            required_class: 0,
        };
        nodes::insert(&conn, &node).expect("node");

        logs::append_traffic(&conn, 1, 1, 10, 20, NOW - 5 * DAY_SECS).expect("old");
        logs::append_traffic(&conn, 1, 1, 10, 20, NOW - DAY_SECS).expect("recent");
        logs::append_online(&conn, 1, 4, NOW - 5 * DAY_SECS).expect("old");
        logs::append_online(&conn, 1, 4, NOW - DAY_SECS).expect("recent");

        let summary = run(&mut conn, NOW);
        assert_eq!(summary.traffic_rows_trimmed, 1);
        assert_eq!(summary.online_rows_trimmed, 1);
    }
}
