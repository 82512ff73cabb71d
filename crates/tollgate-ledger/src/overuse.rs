//! Windowed overuse detection.
//!
//! Usage within a window is computed against a cached baseline rather than
//! by scanning history: `window_usage = current_total - baseline`. The
//! first scan of a window only primes the baseline; afterwards every scan
//! unconditionally refreshes it with a TTL of 1.5 windows, so a crashed or
//! skipped cycle just restarts tracking. A window can therefore span
//! somewhat more or less than its nominal length in pathological timing —
//! accepted, bounded inaccuracy.

use std::ops::RangeInclusive;

use rusqlite::Connection;
use tollgate_cache::SnapshotCache;
use tollgate_db::queries::accounts;
use tollgate_types::limits::{DAILY_OVERUSE_BYTES, HOURLY_OVERUSE_BYTES};
use tollgate_types::{DAY_SECS, HOUR_SECS};

use crate::Result;

/// Accounts scanned per batch within one group.
const SCAN_BATCH: u32 = 500;

/// A fixed usage window with its contractual threshold and group scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    Hourly,
    Daily,
}

impl Window {
    /// Nominal window length in seconds.
    pub fn length_secs(self) -> u64 {
        match self {
            Window::Hourly => HOUR_SECS,
            Window::Daily => DAY_SECS,
        }
    }

    /// Usage threshold over one window.
    pub fn threshold_bytes(self) -> u64 {
        match self {
            Window::Hourly => HOURLY_OVERUSE_BYTES,
            Window::Daily => DAILY_OVERUSE_BYTES,
        }
    }

    /// Node groups this window polices. Group 1 is unmetered in both.
    pub fn groups(self) -> RangeInclusive<u32> {
        match self {
            Window::Hourly => 2..=3,
            Window::Daily => 2..=5,
        }
    }

    /// Baseline TTL: one and a half windows.
    pub fn baseline_ttl_secs(self) -> u64 {
        self.length_secs() + self.length_secs() / 2
    }

    /// Account-scoped, window-scoped baseline cache key.
    pub fn baseline_key(self, account_id: i64) -> String {
        match self {
            Window::Hourly => format!("acct:{account_id}:window:hour"),
            Window::Daily => format!("acct:{account_id}:window:day"),
        }
    }

    fn warning(self, now: u64) -> String {
        match self {
            Window::Hourly => format!(
                "{now}: traffic spike exceeded the hourly fair-use limit; \
                 account protection engaged, contact support to lift it"
            ),
            Window::Daily => format!(
                "{now}: unusual traffic volume over the last day; \
                 account protection engaged, contact support to lift it"
            ),
        }
    }
}

/// Result of one overuse scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Accounts examined.
    pub scanned: usize,
    /// Accounts seen for the first time this window (baseline primed only).
    pub primed: usize,
    /// Accounts disabled for exceeding the threshold.
    pub disabled: usize,
}

/// Scan every group the window polices and disable accounts whose usage
/// since the baseline exceeds the threshold.
///
/// Per-account failures are logged and skipped; the scan always proceeds to
/// the next account.
pub fn scan(
    conn: &Connection,
    cache: &SnapshotCache,
    window: Window,
    now: u64,
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    let active_since = now.saturating_sub(window.length_secs());

    for group in window.groups() {
        let mut after_id = 0i64;
        loop {
            let batch =
                accounts::group_active_accounts(conn, group, active_since, after_id, SCAN_BATCH)?;
            if batch.is_empty() {
                break;
            }
            after_id = batch[batch.len() - 1].id;

            for usage in &batch {
                summary.scanned += 1;
                if let Err(e) = scan_account(conn, cache, window, usage.id, usage.total(), now, &mut summary) {
                    tracing::warn!(account_id = usage.id, error = %e, "overuse scan failed for account, skipped");
                }
            }
        }
    }

    tracing::info!(
        window = ?window,
        scanned = summary.scanned,
        primed = summary.primed,
        disabled = summary.disabled,
        "overuse scan complete"
    );
    Ok(summary)
}

fn scan_account(
    conn: &Connection,
    cache: &SnapshotCache,
    window: Window,
    account_id: i64,
    current_total: u64,
    now: u64,
    summary: &mut ScanSummary,
) -> Result<()> {
    let key = window.baseline_key(account_id);

    match cache.get_int(&key, now) {
        Some(baseline) => {
            let window_usage = current_total.saturating_sub(baseline);
            if window_usage > window.threshold_bytes() {
                accounts::disable_with_warning(conn, account_id, &window.warning(now))?;
                summary.disabled += 1;
                tracing::warn!(
                    account_id,
                    window = ?window,
                    window_usage,
                    "account disabled for window overuse"
                );
            }
        }
        None => {
            // First sight this window: prime the baseline, decide next time.
            summary.primed += 1;
        }
    }

    // Unconditional refresh, whatever the outcome above.
    cache.put_int(&key, current_total, window.baseline_ttl_secs(), now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_db::queries::accounts as account_queries;
    use tollgate_types::{Account, GIB};

    fn test_db() -> Connection {
        tollgate_db::open_memory().expect("open test db")
    }

    fn add_account(conn: &Connection, id: i64, group: u32, total: u64, last_active_at: u64) {
        let account = Account {
            id,
            email: format!("user{id}@example.com"),
            uploaded: total / 2,
            downloaded: total - total / 2,
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
        account_queries::insert(conn, &account).expect("insert account");
    }

    fn bump_traffic(conn: &Connection, id: i64, bytes: u64, now: u64) {
        account_queries::apply_traffic_delta(conn, id, 0, bytes, now).expect("delta");
    }

    #[test]
    fn test_first_scan_primes_without_disabling() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let now = 1_000_000;
        add_account(&conn, 1, 2, 100 * GIB, now - 10);

        let summary = scan(&conn, &cache, Window::Hourly, now).expect("scan");
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.primed, 1);
        assert_eq!(summary.disabled, 0);
        assert!(account_queries::get(&conn, 1).expect("get").enabled);
        assert_eq!(
            cache.get_int(&Window::Hourly.baseline_key(1), now),
            Some(100 * GIB)
        );
    }

    #[test]
    fn test_hourly_overuse_disables_with_warning() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let t0 = 1_000_000;
        add_account(&conn, 1, 2, 0, t0 - 10);

        scan(&conn, &cache, Window::Hourly, t0).expect("prime");

        // 7 GiB within the hour, over the 6 GiB limit.
        bump_traffic(&conn, 1, 7 * GIB, t0 + 1800);
        let summary = scan(&conn, &cache, Window::Hourly, t0 + 3600).expect("scan");

        assert_eq!(summary.disabled, 1);
        let account = account_queries::get(&conn, 1).expect("get");
        assert!(!account.enabled);
        assert!(account.warning_message.is_some());
        assert!(!account.warning_message.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_usage_at_threshold_not_disabled() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let t0 = 1_000_000;
        add_account(&conn, 1, 2, 0, t0 - 10);

        scan(&conn, &cache, Window::Hourly, t0).expect("prime");
        bump_traffic(&conn, 1, 6 * GIB, t0 + 100);
        let summary = scan(&conn, &cache, Window::Hourly, t0 + 3600).expect("scan");

        assert_eq!(summary.disabled, 0);
        assert!(account_queries::get(&conn, 1).expect("get").enabled);
    }

    #[test]
    fn test_baseline_refreshed_after_check() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let t0 = 1_000_000;
        add_account(&conn, 1, 2, 0, t0 - 10);

        scan(&conn, &cache, Window::Hourly, t0).expect("prime");
        bump_traffic(&conn, 1, 2 * GIB, t0 + 100);
        scan(&conn, &cache, Window::Hourly, t0 + 3600).expect("scan");

        // The baseline moved up to the current total, so the same 2 GiB is
        // not counted twice.
        assert_eq!(
            cache.get_int(&Window::Hourly.baseline_key(1), t0 + 3600),
            Some(2 * GIB)
        );
    }

    #[test]
    fn test_expired_baseline_restarts_tracking() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let t0 = 1_000_000;
        add_account(&conn, 1, 2, 0, t0 - 10);

        scan(&conn, &cache, Window::Hourly, t0).expect("prime");
        bump_traffic(&conn, 1, 20 * GIB, t0 + 100);

        // Two skipped cycles: the baseline TTL (1.5h) lapses, so the next
        // scan primes again instead of disabling.
        let later = t0 + 3 * 3600;
        account_queries::apply_traffic_delta(&conn, 1, 0, 0, later - 10).expect("touch");
        let summary = scan(&conn, &cache, Window::Hourly, later).expect("scan");
        assert_eq!(summary.primed, 1);
        assert_eq!(summary.disabled, 0);
    }

    #[test]
    fn test_daily_window_covers_groups_2_to_5() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let t0 = 1_000_000;
        for (id, group) in [(1, 1), (2, 2), (3, 5), (4, 6)] {
            add_account(&conn, id, group, 0, t0 - 10);
        }

        scan(&conn, &cache, Window::Daily, t0).expect("prime");
        for id in 1..=4 {
            bump_traffic(&conn, id, 40 * GIB, t0 + 100);
        }
        let summary = scan(&conn, &cache, Window::Daily, t0 + DAY_SECS).expect("scan");

        // Only the accounts in groups 2 and 5 are policed.
        assert_eq!(summary.disabled, 2);
        assert!(account_queries::get(&conn, 1).expect("get").enabled);
        assert!(!account_queries::get(&conn, 2).expect("get").enabled);
        assert!(!account_queries::get(&conn, 3).expect("get").enabled);
        assert!(account_queries::get(&conn, 4).expect("get").enabled);
    }

    #[test]
    fn test_inactive_accounts_not_scanned() {
        let conn = test_db();
        let cache = SnapshotCache::new();
        let now = 1_000_000;
        // Last active two hours ago, outside the hourly window.
        add_account(&conn, 1, 2, 10 * GIB, now - 7200);

        let summary = scan(&conn, &cache, Window::Hourly, now).expect("scan");
        assert_eq!(summary.scanned, 0);
    }
}
