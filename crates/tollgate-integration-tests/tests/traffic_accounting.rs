//! Integration test: traffic report accounting end to end.
//!
//! Exercises the report path across nodes, accounts, logs, and the
//! snapshot cache:
//! 1. Apply a multi-item report and verify counters on both sides
//! 2. Unknown accounts are skipped but still count against the node
//! 3. A report from an unregistered node is rejected outright
//! 4. Online counts land in the database and the cache, and expire from
//!    the cache on schedule

use tollgate_cache::SnapshotCache;
use tollgate_db::queries::{accounts, nodes};
use tollgate_integration_tests::{blank_account, fresh_node, seeded_db, BASE_TIME};
use tollgate_ledger::report::{self, online_key};
use tollgate_ledger::LedgerError;
use tollgate_types::{OnlineReport, ReportItem};

#[test]
fn report_updates_accounts_and_node_bandwidth() {
    let conn = seeded_db(BASE_TIME);
    accounts::insert(&conn, &blank_account(2)).expect("second account");

    let items = vec![
        ReportItem {
            account_id: 1,
            upload_bytes: 1_000,
            download_bytes: 9_000,
        },
        ReportItem {
            account_id: 2,
            upload_bytes: 500,
            download_bytes: 1_500,
        },
    ];
    let summary = report::apply_report(&conn, 1, &items, BASE_TIME).expect("apply");
    assert_eq!(summary.updated_count, 2);
    assert_eq!(summary.total_bytes, 12_000);

    let first = accounts::get(&conn, 1).expect("get");
    assert_eq!(first.uploaded, 1_000);
    assert_eq!(first.downloaded, 9_000);
    assert_eq!(first.last_active_at, BASE_TIME);

    let node = nodes::get(&conn, 1).expect("node");
    assert_eq!(node.bandwidth_used, 12_000);
}

#[test]
fn unknown_account_skipped_but_counted_for_node() {
    let conn = seeded_db(BASE_TIME);

    let items = vec![
        ReportItem {
            account_id: 1,
            upload_bytes: 100,
            download_bytes: 200,
        },
        ReportItem {
            account_id: 999,
            upload_bytes: 4_000,
            download_bytes: 0,
        },
    ];
    let summary = report::apply_report(&conn, 1, &items, BASE_TIME).expect("apply");

    // One account row updated; the node relayed all the bytes regardless.
    assert_eq!(summary.updated_count, 1);
    assert_eq!(summary.total_bytes, 4_300);
    assert_eq!(nodes::get(&conn, 1).expect("node").bandwidth_used, 4_300);
}

#[test]
fn unknown_node_rejected_without_side_effects() {
    let conn = seeded_db(BASE_TIME);

    let items = vec![ReportItem {
        account_id: 1,
        upload_bytes: 100,
        download_bytes: 100,
    }];
    let err = report::apply_report(&conn, 42, &items, BASE_TIME);
    assert!(matches!(err, Err(LedgerError::NodeNotFound(42))));

    let account = accounts::get(&conn, 1).expect("get");
    assert_eq!(account.uploaded, 0);
    assert_eq!(account.downloaded, 0);
}

#[test]
fn online_report_persisted_and_cached_with_ttl() {
    let conn = seeded_db(BASE_TIME);
    let second = fresh_node(2, BASE_TIME);
    nodes::insert(&conn, &second).expect("second node");
    let cache = SnapshotCache::new();

    let online = OnlineReport {
        node_id: 2,
        online_count: 17,
        load: Some("0.42 0.40 0.35".to_string()),
    };
    report::record_online(&conn, &cache, &online, BASE_TIME).expect("online");

    assert_eq!(nodes::get(&conn, 2).expect("node").online_count, 17);
    assert_eq!(cache.get_int(&online_key(2), BASE_TIME + 60), Some(17));

    // The cached value is short-lived; the row is not.
    assert_eq!(cache.get_int(&online_key(2), BASE_TIME + 3_600), None);
    assert_eq!(nodes::get(&conn, 2).expect("node").online_count, 17);
}
