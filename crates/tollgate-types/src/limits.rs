//! Contractual numeric thresholds.
//!
//! These are part of the service contract, not tunable configuration. The
//! only operator-configurable values are the commission rate and the default
//! quota grant, which live in the daemon config.

use crate::{DAY_SECS, GIB, HOUR_SECS};

/// Hourly overuse threshold (groups 2-3).
pub const HOURLY_OVERUSE_BYTES: u64 = 6 * GIB;

/// Daily overuse threshold (groups 2-5).
pub const DAILY_OVERUSE_BYTES: u64 = 32 * GIB;

/// A node whose heartbeat is older than this is hidden.
pub const NODE_STALE_SECS: u64 = 7200;

/// Paid accounts idle for this long are disabled...
pub const UNUSED_DISABLE_SECS: u64 = 32 * DAY_SECS;

/// ...but only once the account is at least this old.
pub const MIN_ACCOUNT_AGE_SECS: u64 = 30 * DAY_SECS;

/// Never-used free accounts are disabled after this registration age.
pub const NEVER_USED_AGE_SECS: u64 = 14 * DAY_SECS;

/// Balance ceiling (cents) for the never-used disable predicate.
pub const NEVER_USED_BALANCE_MAX_CENTS: i64 = 100;

/// Accounts with an id at or below this are system accounts and exempt from
/// inactivity cleanup.
pub const SYSTEM_ACCOUNT_MAX_ID: i64 = 10;

/// Unpaid orders older than this are purged.
pub const UNPAID_ORDER_TTL_SECS: u64 = HOUR_SECS;

/// Traffic and online logs are retained this long.
pub const LOG_RETENTION_SECS: u64 = 3 * DAY_SECS;

/// Node online/load cache entries expire after this.
pub const ONLINE_TTL_SECS: u64 = 300;

/// Daily quota granted per service class on renewal.
pub const RENEWAL_QUOTA_PER_CLASS: u64 = 10 * GIB;

/// Renewal period granted per service class.
pub const RENEWAL_PERIOD_PER_CLASS_SECS: u64 = 10 * DAY_SECS;
