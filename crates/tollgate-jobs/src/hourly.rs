//! The hourly job.
//!
//! Runs once an hour: hourly overuse scan for the metered groups and the
//! purge of stale unpaid orders.

use rusqlite::Connection;
use tollgate_cache::SnapshotCache;
use tollgate_db::queries::orders;
use tollgate_ledger::overuse::{self, Window};
use tollgate_types::limits::UNPAID_ORDER_TTL_SECS;

use crate::{run_step, Result};

/// Counts from one hourly run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HourlySummary {
    pub overuse_disabled: usize,
    pub orders_purged: usize,
}

/// Run the hourly job. Step failures are logged and skipped.
pub fn run(conn: &mut Connection, cache: &SnapshotCache, now: u64) -> HourlySummary {
    tracing::info!("hourly job started");

    let summary = HourlySummary {
        overuse_disabled: run_step(
            "hourly",
            "overuse_scan",
            overuse::scan(conn, cache, Window::Hourly, now)
                .map(|s| s.disabled)
                .map_err(Into::into),
        ),
        orders_purged: run_step("hourly", "purge_unpaid_orders", purge_unpaid_orders(conn, now)),
    };

    tracing::info!(?summary, "hourly job complete");
    summary
}

/// Delete unpaid orders that outlived their TTL.
fn purge_unpaid_orders(conn: &Connection, now: u64) -> Result<usize> {
    let cutoff = now.saturating_sub(UNPAID_ORDER_TTL_SECS);
    Ok(orders::delete_stale_unpaid(conn, cutoff)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_db::queries::accounts;
    use tollgate_types::{Account, GIB, HOUR_SECS};

    fn test_db() -> Connection {
        tollgate_db::open_memory().expect("open test db")
    }

    fn add_account(conn: &Connection, id: i64, group: u32, last_active_at: u64) {
        let account = Account {
            id,
            email: format!("user{id}@example.com"),
            uploaded: 0,
            downloaded: 0,
            quota_total: 0,
            quota_daily_limit: 0,
            last_day_downloaded: 0,
            sub_count: 0,
            sub_count_lastday: 0,
            last_active_at,
            renewal_due_at: 0,
            service_class: 1,
            class_expires_at: 0,
            account_expires_at: 0,
            node_group: group,
            enabled: true,
            warning_message: None,
            ban_count: 0,
            score: 0,
            referrer_id: 0,
            balance: 0,
            registered_at: 0,
        };
        accounts::insert(conn, &account).expect("insert account");
    }

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_hourly_overuse_scenario() {
        let mut conn = test_db();
        let cache = SnapshotCache::new();
        add_account(&conn, 1, 2, NOW - 10);

        // First run primes the baseline.
        let summary = run(&mut conn, &cache, NOW);
        assert_eq!(summary.overuse_disabled, 0);

        // 7 GiB within the hour.
        accounts::apply_traffic_delta(&conn, 1, 0, 7 * GIB, NOW + 600).expect("delta");
        let summary = run(&mut conn, &cache, NOW + HOUR_SECS);
        assert_eq!(summary.overuse_disabled, 1);

        let account = accounts::get(&conn, 1).expect("get");
        assert!(!account.enabled);
        assert!(account.warning_message.is_some());
    }

    #[test]
    fn test_group_4_exempt_from_hourly_scan() {
        let mut conn = test_db();
        let cache = SnapshotCache::new();
        add_account(&conn, 1, 4, NOW - 10);

        run(&mut conn, &cache, NOW);
        accounts::apply_traffic_delta(&conn, 1, 0, 20 * GIB, NOW + 600).expect("delta");
        let summary = run(&mut conn, &cache, NOW + HOUR_SECS);

        assert_eq!(summary.overuse_disabled, 0);
        assert!(accounts::get(&conn, 1).expect("get").enabled);
    }

    #[test]
    fn test_stale_unpaid_orders_purged() {
        let mut conn = test_db();
        let cache = SnapshotCache::new();
        add_account(&conn, 1, 1, 0);

        orders::insert(&conn, 1, 100, "TG-old", NOW - 2 * HOUR_SECS).expect("old");
        orders::insert(&conn, 1, 100, "TG-new", NOW - 60).expect("new");

        let summary = run(&mut conn, &cache, NOW);
        assert_eq!(summary.orders_purged, 1);
    }
}
