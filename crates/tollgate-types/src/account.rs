//! Subscriber accounts.

use serde::{Deserialize, Serialize};

/// A metered subscriber account.
///
/// Traffic counters are monotonic except on the explicit daily rollover
/// (`uploaded += downloaded; downloaded = 0`) and the purchase-time reset.
/// Accounts are never hard-deleted by the core; they are disabled instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    /// Lifetime upload bytes.
    pub uploaded: u64,
    /// Download bytes since the last rollover.
    pub downloaded: u64,
    /// Total transfer quota in bytes.
    pub quota_total: u64,
    /// Daily transfer quota in bytes, recomputed on renewal.
    pub quota_daily_limit: u64,
    /// Yesterday's download counter, snapshotted by the daily job.
    pub last_day_downloaded: u64,
    /// Subscription fetch counter.
    pub sub_count: u64,
    /// Yesterday's subscription fetch counter.
    pub sub_count_lastday: u64,
    /// Last time a node reported traffic for this account (0 = never).
    pub last_active_at: u64,
    /// When the daily quota rolls over next.
    pub renewal_due_at: u64,
    /// Paid service class (0 = free tier).
    pub service_class: u32,
    /// When `service_class` expires back to 0.
    pub class_expires_at: u64,
    /// When the account itself expires.
    pub account_expires_at: u64,
    /// Node group this account routes through (group 1 is unmetered).
    pub node_group: u32,
    pub enabled: bool,
    /// Human-readable reason attached when the account is disabled.
    pub warning_message: Option<String>,
    /// Accumulated penalty count.
    pub ban_count: u32,
    pub score: i64,
    /// Referring account id (0 = none).
    pub referrer_id: i64,
    /// Balance in cents. May be negative.
    pub balance: i64,
    pub registered_at: u64,
}

impl Account {
    /// Lifetime traffic total used for window-relative usage computation.
    pub fn total_traffic(&self) -> u64 {
        self.uploaded.saturating_add(self.downloaded)
    }
}
