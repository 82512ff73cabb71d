//! Integration test crate for the tollgate service.
//!
//! This crate has no library code beyond shared fixtures. The tests
//! exercise end-to-end accounting flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tollgate-integration-tests
//! ```

use rusqlite::Connection;
use tollgate_db::queries::{accounts, nodes};
use tollgate_types::{Account, Node};

/// Base timestamp for test scenarios.
pub const BASE_TIME: u64 = 1_700_000_000;

/// An enabled account with no traffic, quota, or referrer.
pub fn blank_account(id: i64) -> Account {
    Account {
        id,
        email: format!("user{id}@example.com"),
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
        registered_at: BASE_TIME - 90 * tollgate_types::DAY_SECS,
    }
}

/// A visible node with a fresh heartbeat.
pub fn fresh_node(id: i64, now: u64) -> Node {
    Node {
        id,
        name: format!("edge-{id}"),
        bandwidth_used: 0,
        bandwidth_limit: 0,
        last_heartbeat_at: now,
        online_count: 0,
        visible: true,
        node_group: 1,
        required_class: 0,
    }
}

/// Open an in-memory database seeded with one account and one node.
pub fn seeded_db(now: u64) -> Connection {
    let conn = tollgate_db::open_memory().expect("open test db");
    accounts::insert(&conn, &blank_account(1)).expect("seed account");
    nodes::insert(&conn, &fresh_node(1, now)).expect("seed node");
    conn
}
