//! The fast check job.
//!
//! Runs every ten minutes: purges expired cache entries, cleans up
//! accounts that registered but never connected, and penalizes accounts
//! whose balance went negative.

use rusqlite::Connection;
use tollgate_cache::SnapshotCache;
use tollgate_db::queries::accounts;
use tollgate_referral::ledger::{recover_commission_in, RecoveryOutcome};
use tollgate_types::limits::{NEVER_USED_AGE_SECS, NEVER_USED_BALANCE_MAX_CENTS};

use crate::{run_step, Result};

/// Counts from one check run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub cache_purged: usize,
    pub never_used_disabled: usize,
    pub penalized: usize,
}

/// Run the check job. Step failures are logged and skipped.
pub fn run(conn: &mut Connection, cache: &SnapshotCache, now: u64) -> CheckSummary {
    tracing::debug!("check job started");

    let summary = CheckSummary {
        cache_purged: run_step("check", "purge_cache", Ok(cache.purge_expired(now))),
        never_used_disabled: run_step(
            "check",
            "disable_never_used",
            disable_never_used(conn, now),
        ),
        penalized: run_step(
            "check",
            "penalize_negative_balance",
            penalize_negative_balance(conn, now),
        ),
    };

    tracing::debug!(?summary, "check job complete");
    summary
}

/// Disable accounts that never generated any traffic: old enough, free
/// tier, negligible balance. Any signup bonus their referrer collected is
/// clawed back in the same transaction as the disable, so a retried run
/// never double-debits. One failing account does not stop the sweep.
fn disable_never_used(conn: &mut Connection, now: u64) -> Result<usize> {
    let registered_before = now.saturating_sub(NEVER_USED_AGE_SECS);
    let candidates =
        accounts::never_used_candidates(conn, registered_before, NEVER_USED_BALANCE_MAX_CENTS)?;

    let mut disabled = 0usize;
    for id in candidates {
        match disable_one_never_used(conn, id, now) {
            Ok(recovery) => {
                if let RecoveryOutcome::Recovered {
                    referrer_id,
                    amount_cents,
                } = recovery
                {
                    tracing::info!(
                        account_id = id,
                        referrer_id,
                        amount_cents,
                        "signup bonus recovered from referrer"
                    );
                }
                disabled += 1;
            }
            Err(e) => {
                tracing::warn!(account_id = id, error = %e, "never-used disable failed, skipped");
            }
        }
    }
    Ok(disabled)
}

fn disable_one_never_used(conn: &mut Connection, id: i64, now: u64) -> Result<RecoveryOutcome> {
    let tx = conn.transaction()?;
    let recovery = recover_commission_in(&tx, id, now)?;
    let warning = format!("{now}: account never used since registration; disabled by cleanup");
    accounts::disable_with_warning(&tx, id, &warning)?;
    tx.commit()?;
    Ok(recovery)
}

/// Disable accounts with a negative balance and apply the ban-count,
/// score, and node-group penalties. One failing account does not stop
/// the sweep.
fn penalize_negative_balance(conn: &Connection, now: u64) -> Result<usize> {
    let offenders = accounts::negative_balance_accounts(conn)?;
    let mut penalized = 0usize;
    for offender in offenders {
        let warning = format!("{now}: balance below zero; top up to restore access");
        match accounts::apply_negative_balance_penalty(conn, offender.id, &warning) {
            Ok(()) => {
                tracing::info!(
                    account_id = offender.id,
                    service_class = offender.service_class,
                    "negative balance penalty applied"
                );
                penalized += 1;
            }
            Err(e) => {
                tracing::warn!(account_id = offender.id, error = %e, "negative balance penalty failed, skipped");
            }
        }
    }
    Ok(penalized)
}
