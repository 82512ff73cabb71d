//! Commission credit, signup bonus, and recovery operations.
//!
//! Each public operation has two forms: a `*_in` variant that runs against
//! a caller-held connection (used by the purchase settlement transaction to
//! fold the commission into its own atomic unit), and a wrapper that opens
//! its own transaction.

use rusqlite::Connection;
use tollgate_db::queries::{accounts, referral};
use tollgate_types::ReferralKind;

use crate::{commission_cents, Result};

/// Outcome of a commission or signup-bonus credit. The no-op variants are
/// successes, not failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommissionOutcome {
    /// Referrer's balance was credited.
    Credited { referrer_id: i64, amount_cents: i64 },
    /// The account has no referrer; nothing happened.
    NoReferrer,
    /// An entry for this settlement (or this pair, for bonuses) already
    /// exists; nothing happened.
    AlreadyCredited,
}

/// Outcome of a commission recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Referrer was debited and penalized; the original entry is now
    /// flagged recovered.
    Recovered { referrer_id: i64, amount_cents: i64 },
    /// The account has no referrer; nothing happened.
    NoReferrer,
    /// No signup bonus was ever credited for the account; nothing happened.
    NoBonus,
    /// The bonus was already recovered; nothing happened.
    AlreadyRecovered,
}

/// Credit the purchase commission for a settled order, inside the caller's
/// transaction.
///
/// Dedup key is the order id: replays of the same settlement are no-ops,
/// later orders by the same account credit again.
pub fn credit_commission_in(
    conn: &Connection,
    order_id: i64,
    account_id: i64,
    amount_cents: i64,
    rate: f64,
    now: u64,
) -> Result<CommissionOutcome> {
    let account = accounts::get(conn, account_id)?;
    if account.referrer_id == 0 {
        return Ok(CommissionOutcome::NoReferrer);
    }

    if referral::commission_exists_for_order(conn, order_id)? {
        tracing::info!(order_id, account_id, "commission already credited for order");
        return Ok(CommissionOutcome::AlreadyCredited);
    }

    let commission = commission_cents(amount_cents, rate);
    accounts::credit_balance(conn, account.referrer_id, commission)?;
    referral::insert_entry(
        conn,
        account_id,
        account.referrer_id,
        Some(order_id),
        ReferralKind::Commission,
        commission,
        now,
    )?;

    tracing::info!(
        order_id,
        account_id,
        referrer_id = account.referrer_id,
        commission,
        "referral commission credited"
    );
    Ok(CommissionOutcome::Credited {
        referrer_id: account.referrer_id,
        amount_cents: commission,
    })
}

/// Credit the purchase commission for a settled order in its own
/// transaction.
pub fn credit_commission(
    conn: &mut Connection,
    order_id: i64,
    account_id: i64,
    amount_cents: i64,
    rate: f64,
    now: u64,
) -> Result<CommissionOutcome> {
    let tx = conn.transaction()?;
    let outcome = credit_commission_in(&tx, order_id, account_id, amount_cents, rate, now)?;
    tx.commit()?;
    Ok(outcome)
}

/// Credit the one-time registration bonus to an account's referrer.
///
/// Deduped per (account, referrer) pair: at most one bonus per referred
/// account, ever.
pub fn record_signup_bonus(
    conn: &mut Connection,
    account_id: i64,
    amount_cents: i64,
    now: u64,
) -> Result<CommissionOutcome> {
    let tx = conn.transaction()?;

    let account = accounts::get(&tx, account_id)?;
    if account.referrer_id == 0 {
        return Ok(CommissionOutcome::NoReferrer);
    }
    if referral::signup_bonus(&tx, account_id)?.is_some() {
        return Ok(CommissionOutcome::AlreadyCredited);
    }

    accounts::credit_balance(&tx, account.referrer_id, amount_cents)?;
    referral::insert_entry(
        &tx,
        account_id,
        account.referrer_id,
        None,
        ReferralKind::SignupBonus,
        amount_cents,
        now,
    )?;
    tx.commit()?;

    tracing::info!(
        account_id,
        referrer_id = account.referrer_id,
        amount_cents,
        "signup bonus credited"
    );
    Ok(CommissionOutcome::Credited {
        referrer_id: account.referrer_id,
        amount_cents,
    })
}

/// Reverse the signup bonus after the referred account was disabled or
/// banned, inside the caller's transaction.
///
/// Exactly once: the referrer is debited by the original amount and
/// penalized one ban count, a recovery entry holding the exact negation is
/// appended, and the original entry's recovered flag is flipped.
pub fn recover_commission_in(
    conn: &Connection,
    account_id: i64,
    now: u64,
) -> Result<RecoveryOutcome> {
    let account = accounts::get(conn, account_id)?;
    if account.referrer_id == 0 {
        return Ok(RecoveryOutcome::NoReferrer);
    }

    let Some(bonus) = referral::signup_bonus(conn, account_id)? else {
        return Ok(RecoveryOutcome::NoBonus);
    };

    if referral::recovery_exists(conn, account_id, bonus.referrer_id)? {
        tracing::info!(account_id, "signup bonus already recovered");
        return Ok(RecoveryOutcome::AlreadyRecovered);
    }

    accounts::credit_balance(conn, bonus.referrer_id, -bonus.amount)?;
    conn.execute(
        "UPDATE accounts SET ban_count = ban_count + 1 WHERE id = ?1",
        [bonus.referrer_id],
    )
    .map_err(tollgate_db::DbError::Sqlite)?;

    referral::insert_entry(
        conn,
        account_id,
        bonus.referrer_id,
        None,
        ReferralKind::Recovery,
        -bonus.amount,
        now,
    )?;
    referral::mark_recovered(conn, bonus.id)?;

    tracing::info!(
        account_id,
        referrer_id = bonus.referrer_id,
        amount_cents = bonus.amount,
        "signup bonus recovered"
    );
    Ok(RecoveryOutcome::Recovered {
        referrer_id: bonus.referrer_id,
        amount_cents: bonus.amount,
    })
}

/// Reverse the signup bonus in its own transaction.
pub fn recover_commission(
    conn: &mut Connection,
    account_id: i64,
    now: u64,
) -> Result<RecoveryOutcome> {
    let tx = conn.transaction()?;
    let outcome = recover_commission_in(&tx, account_id, now)?;
    tx.commit()?;
    Ok(outcome)
}
