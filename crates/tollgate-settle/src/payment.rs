//! Payment order creation and gateway callback processing.
//!
//! Gateway signature verification happens upstream; by the time a callback
//! reaches `process_payment` it is trusted. Callbacks are retried by
//! gateways, so the paid transition must be replay-safe: a second
//! notification for an already-paid order reports [`PaymentOutcome::AlreadyPaid`]
//! and changes nothing.

use rand::Rng;
use rusqlite::Connection;
use tollgate_db::queries::{accounts, orders};
use tollgate_referral::ledger::credit_commission_in;
use tollgate_referral::CommissionOutcome;
use tollgate_types::OrderStatus;

use crate::{Result, SettleError};

/// Outcome of a payment callback. `AlreadyPaid` is a success, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The order transitioned to paid and the balance was credited.
    Paid {
        order_id: i64,
        account_id: i64,
        amount_cents: i64,
        commission: CommissionOutcome,
    },
    /// A replayed notification for an order that was already settled.
    AlreadyPaid { order_id: i64 },
}

/// Create an unpaid order for a balance top-up. Returns the order id.
pub fn create_order(
    conn: &Connection,
    account_id: i64,
    amount_cents: i64,
    now: u64,
) -> Result<i64> {
    // Ensure the account exists before opening an order for it.
    match accounts::get(conn, account_id) {
        Ok(_) => {}
        Err(tollgate_db::DbError::NotFound(_)) => {
            return Err(SettleError::AccountNotFound(account_id))
        }
        Err(e) => return Err(e.into()),
    }

    let nonce: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    let trade_no = format!("TG-{now}-{account_id}-{nonce}");
    let order_id = orders::insert(conn, account_id, amount_cents, &trade_no, now)?;

    tracing::info!(order_id, account_id, amount_cents, "payment order created");
    Ok(order_id)
}

/// Process a successful gateway callback for an order.
///
/// In one transaction: mark the order paid, credit the account balance, and
/// credit the referral commission keyed by this order.
pub fn process_payment(
    conn: &mut Connection,
    order_id: i64,
    trade_no: &str,
    commission_rate: f64,
    now: u64,
) -> Result<PaymentOutcome> {
    let tx = conn.transaction()?;

    let order = match orders::get(&tx, order_id) {
        Ok(o) => o,
        Err(tollgate_db::DbError::NotFound(_)) => {
            return Err(SettleError::OrderNotFound(order_id))
        }
        Err(e) => return Err(e.into()),
    };

    if order.status == OrderStatus::Paid {
        tracing::info!(order_id, "duplicate payment notification ignored");
        return Ok(PaymentOutcome::AlreadyPaid { order_id });
    }

    // The guarded update is the real replay gate; the status check above
    // only saves the balance work.
    if !orders::mark_paid(&tx, order_id, trade_no)? {
        return Ok(PaymentOutcome::AlreadyPaid { order_id });
    }

    accounts::credit_balance(&tx, order.account_id, order.amount)?;

    let commission = credit_commission_in(
        &tx,
        order_id,
        order.account_id,
        order.amount,
        commission_rate,
        now,
    )?;

    tx.commit()?;

    tracing::info!(
        order_id,
        account_id = order.account_id,
        amount_cents = order.amount,
        "payment settled"
    );
    Ok(PaymentOutcome::Paid {
        order_id,
        account_id: order.account_id,
        amount_cents: order.amount,
        commission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_types::Account;

    fn test_db() -> Connection {
        tollgate_db::open_memory().expect("open test db")
    }

    fn add_account(conn: &Connection, id: i64, referrer_id: i64) {
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
            last_active_at: 0,
            renewal_due_at: 0,
            service_class: 0,
            class_expires_at: 0,
            account_expires_at: 0,
            node_group: 0,
            enabled: true,
            warning_message: None,
            ban_count: 0,
            score: 0,
            referrer_id,
            balance: 0,
            registered_at: 0,
        };
        accounts::insert(conn, &account).expect("insert account");
    }

    #[test]
    fn test_create_order_unknown_account() {
        let conn = test_db();
        let err = create_order(&conn, 9, 1_000, 0).expect_err("must fail");
        assert!(matches!(err, SettleError::AccountNotFound(9)));
    }

    #[test]
    fn test_payment_credits_balance_and_commission() {
        let mut conn = test_db();
        add_account(&conn, 1, 2);
        add_account(&conn, 2, 0);
        let order_id = create_order(&conn, 1, 1_000, 100).expect("order");

        let outcome =
            process_payment(&mut conn, order_id, "GW-1", 0.2, 200).expect("process");
        match outcome {
            PaymentOutcome::Paid {
                amount_cents,
                commission,
                ..
            } => {
                assert_eq!(amount_cents, 1_000);
                assert_eq!(
                    commission,
                    CommissionOutcome::Credited {
                        referrer_id: 2,
                        amount_cents: 200
                    }
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(accounts::get(&conn, 1).expect("get").balance, 1_000);
        assert_eq!(accounts::get(&conn, 2).expect("get").balance, 200);
    }

    #[test]
    fn test_replay_is_noop() {
        let mut conn = test_db();
        add_account(&conn, 1, 2);
        add_account(&conn, 2, 0);
        let order_id = create_order(&conn, 1, 1_000, 100).expect("order");

        process_payment(&mut conn, order_id, "GW-1", 0.2, 200).expect("first");
        let replay = process_payment(&mut conn, order_id, "GW-1", 0.2, 300).expect("replay");

        assert_eq!(replay, PaymentOutcome::AlreadyPaid { order_id });
        assert_eq!(accounts::get(&conn, 1).expect("get").balance, 1_000);
        assert_eq!(accounts::get(&conn, 2).expect("get").balance, 200);
    }

    #[test]
    fn test_unknown_order() {
        let mut conn = test_db();
        let err = process_payment(&mut conn, 77, "GW-1", 0.2, 0).expect_err("must fail");
        assert!(matches!(err, SettleError::OrderNotFound(77)));
    }

    #[test]
    fn test_payment_without_referrer() {
        let mut conn = test_db();
        add_account(&conn, 1, 0);
        let order_id = create_order(&conn, 1, 500, 100).expect("order");

        let outcome = process_payment(&mut conn, order_id, "GW-1", 0.2, 200).expect("process");
        match outcome {
            PaymentOutcome::Paid { commission, .. } => {
                assert_eq!(commission, CommissionOutcome::NoReferrer);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
