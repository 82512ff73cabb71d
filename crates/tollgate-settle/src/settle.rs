//! The purchase settlement transaction.
//!
//! Balance debit, benefit grants, and the purchase-history row form one
//! all-or-nothing unit; any failure rolls back every part and surfaces a
//! single reason.

use rusqlite::Connection;
use tollgate_db::queries::{accounts, packages};
use tollgate_types::DAY_SECS;

use crate::content::PackageContent;
use crate::{Result, SettleError};

/// Outcome of a successful settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub account_id: i64,
    pub package_id: i64,
    pub price_cents: i64,
    pub new_balance_cents: i64,
    pub class_expires_at: u64,
    pub account_expires_at: u64,
    /// Traffic granted by the package, in bytes.
    pub granted_bytes: u64,
    pub traffic_reset: bool,
}

/// Expiry extension rule: an extension never reduces the field, and a
/// lapsed expiry restarts from now.
fn extend(current: u64, now: u64, days: u64) -> u64 {
    if days == 0 {
        return current;
    }
    current.max(now) + days * DAY_SECS
}

/// Settle a package purchase for an account.
///
/// Preconditions: the package is active and the balance covers the price.
/// On precondition failure nothing is mutated.
pub fn settle(
    conn: &mut Connection,
    account_id: i64,
    package_id: i64,
    now: u64,
) -> Result<Settlement> {
    let tx = conn.transaction()?;

    let package = match packages::get(&tx, package_id) {
        Ok(p) => p,
        Err(tollgate_db::DbError::NotFound(_)) => {
            return Err(SettleError::PackageNotFound(package_id))
        }
        Err(e) => return Err(e.into()),
    };
    if !package.active {
        return Err(SettleError::PackageInactive(package_id));
    }

    let account = match accounts::get(&tx, account_id) {
        Ok(a) => a,
        Err(tollgate_db::DbError::NotFound(_)) => {
            return Err(SettleError::AccountNotFound(account_id))
        }
        Err(e) => return Err(e.into()),
    };
    if account.balance < package.price {
        return Err(SettleError::InsufficientFunds {
            balance_cents: account.balance,
            price_cents: package.price,
        });
    }

    let content = PackageContent::parse(&package.content)?;

    let class_expires_at = extend(account.class_expires_at, now, content.class_expire);
    let account_expires_at = extend(account.account_expires_at, now, content.expire_in);
    let granted_bytes = content.traffic_bytes();

    // Balance debit is relative; the rest are unconditional overwrites
    // computed from the row read inside this same transaction.
    accounts::credit_balance(&tx, account_id, -package.price)?;

    tx.execute(
        "UPDATE accounts
         SET quota_total = quota_total + ?1,
             class_expires_at = ?2,
             account_expires_at = ?3,
             service_class = ?4
         WHERE id = ?5",
        rusqlite::params![
            granted_bytes as i64,
            class_expires_at as i64,
            account_expires_at as i64,
            content.class.unwrap_or(account.service_class) as i64,
            account_id,
        ],
    )?;

    if content.reset_traffic {
        tx.execute(
            "UPDATE accounts SET uploaded = 0, downloaded = 0 WHERE id = ?1",
            [account_id],
        )?;
    }

    let renew_at = if content.class_expire > 0 {
        class_expires_at
    } else {
        0
    };
    packages::record_purchase(&tx, account_id, package_id, package.price, renew_at, now)?;

    tx.commit()?;

    tracing::info!(
        account_id,
        package_id,
        price_cents = package.price,
        granted_bytes,
        "purchase settled"
    );

    Ok(Settlement {
        account_id,
        package_id,
        price_cents: package.price,
        new_balance_cents: account.balance - package.price,
        class_expires_at,
        account_expires_at,
        granted_bytes,
        traffic_reset: content.reset_traffic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_types::{Account, GIB};

    fn test_db() -> Connection {
        tollgate_db::open_memory().expect("open test db")
    }

    fn add_account(conn: &Connection, id: i64, balance: i64) -> Account {
        let account = Account {
            id,
            email: format!("user{id}@example.com"),
            uploaded: 1_000,
            downloaded: 2_000,
            quota_total: 5 * GIB,
            quota_daily_limit: 0,
            last_day_downloaded: 0,
            sub_count: 0,
            sub_count_lastday: 0,
            last_active_at: 0,
            renewal_due_at: 0,
            service_class: 1,
            class_expires_at: 0,
            account_expires_at: 0,
            node_group: 0,
            enabled: true,
            warning_message: None,
            ban_count: 0,
            score: 0,
            referrer_id: 0,
            balance,
            registered_at: 0,
        };
        accounts::insert(conn, &account).expect("insert account");
        account
    }

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_extend_rules() {
        // Zero days leaves the field untouched, even when lapsed.
        assert_eq!(extend(5, NOW, 0), 5);
        // Lapsed expiry restarts from now.
        assert_eq!(extend(5, NOW, 30), NOW + 30 * DAY_SECS);
        // Future expiry stacks.
        let future = NOW + 10 * DAY_SECS;
        assert_eq!(extend(future, NOW, 30), future + 30 * DAY_SECS);
    }

    #[test]
    fn test_settle_applies_all_effects() {
        let mut conn = test_db();
        add_account(&conn, 1, 2_000);
        let package = packages::insert(
            &conn,
            "pro",
            1_500,
            r#"{"traffic":10,"class":3,"class_expire":30,"expire_in":30,"reset_traffic":true}"#,
            true,
        )
        .expect("package");

        let settlement = settle(&mut conn, 1, package, NOW).expect("settle");
        assert_eq!(settlement.new_balance_cents, 500);
        assert_eq!(settlement.granted_bytes, 10 * GIB);

        let account = accounts::get(&conn, 1).expect("get");
        assert_eq!(account.balance, 500);
        assert_eq!(account.quota_total, 15 * GIB);
        assert_eq!(account.service_class, 3);
        assert_eq!(account.class_expires_at, NOW + 30 * DAY_SECS);
        assert_eq!(account.account_expires_at, NOW + 30 * DAY_SECS);
        assert_eq!(account.uploaded, 0);
        assert_eq!(account.downloaded, 0);

        let history = packages::purchase_history(&conn, 1, 10).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 1_500);
    }

    #[test]
    fn test_insufficient_funds_mutates_nothing() {
        let mut conn = test_db();
        let before = add_account(&conn, 1, 100);
        let package = packages::insert(&conn, "pro", 1_500, "{}", true).expect("package");

        let err = settle(&mut conn, 1, package, NOW).expect_err("must fail");
        assert!(matches!(err, SettleError::InsufficientFunds { .. }));

        assert_eq!(accounts::get(&conn, 1).expect("get"), before);
        assert!(packages::purchase_history(&conn, 1, 10).expect("history").is_empty());
    }

    #[test]
    fn test_inactive_package_rejected() {
        let mut conn = test_db();
        add_account(&conn, 1, 10_000);
        let package = packages::insert(&conn, "off", 100, "{}", false).expect("package");

        let err = settle(&mut conn, 1, package, NOW).expect_err("must fail");
        assert!(matches!(err, SettleError::PackageInactive(_)));
    }

    #[test]
    fn test_empty_content_only_debits_and_records() {
        let mut conn = test_db();
        let before = add_account(&conn, 1, 1_000);
        let package = packages::insert(&conn, "donation", 300, "{}", true).expect("package");

        settle(&mut conn, 1, package, NOW).expect("settle");

        let account = accounts::get(&conn, 1).expect("get");
        assert_eq!(account.balance, 700);
        assert_eq!(account.uploaded, before.uploaded);
        assert_eq!(account.quota_total, before.quota_total);
        assert_eq!(account.service_class, before.service_class);
        assert_eq!(account.class_expires_at, before.class_expires_at);
    }

    #[test]
    fn test_history_failure_rolls_back_debit() {
        let mut conn = test_db();
        add_account(&conn, 1, 2_000);
        let package = packages::insert(&conn, "pro", 1_500, "{}", true).expect("package");

        // Force the history insert to fail after the debit succeeded.
        conn.execute_batch("DROP TABLE purchases").expect("drop");

        let err = settle(&mut conn, 1, package, NOW).expect_err("must fail");
        assert!(matches!(err, SettleError::Sqlite(_) | SettleError::Db(_)));

        // The debit was rolled back with everything else.
        assert_eq!(accounts::get(&conn, 1).expect("get").balance, 2_000);
    }

    #[test]
    fn test_invalid_content_rejected_before_mutation() {
        let mut conn = test_db();
        add_account(&conn, 1, 2_000);
        let package =
            packages::insert(&conn, "broken", 100, r#"{"bogus_field":1}"#, true).expect("package");

        let err = settle(&mut conn, 1, package, NOW).expect_err("must fail");
        assert!(matches!(err, SettleError::InvalidContent(_)));
        assert_eq!(accounts::get(&conn, 1).expect("get").balance, 2_000);
    }
}
