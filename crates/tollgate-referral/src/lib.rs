//! # tollgate-referral
//!
//! Referral commission ledger: purchase commissions, signup bonuses, and
//! their idempotent recovery.
//!
//! Idempotency for purchase commissions is keyed by the settlement order
//! id, so a replayed gateway notification for the same order is a no-op
//! while a second legitimate purchase by the same referred account credits
//! again. Idempotent outcomes are reported as [`CommissionOutcome`] /
//! [`RecoveryOutcome`] variants, never as errors.
//!
//! Every credit or reversal pairs a relative balance update with a ledger
//! append inside one transaction.

pub mod ledger;

pub use ledger::{
    credit_commission, record_signup_bonus, recover_commission, CommissionOutcome,
    RecoveryOutcome,
};

/// Error types for referral ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("database error: {0}")]
    Db(#[from] tollgate_db::DbError),

    #[error("transaction error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ReferralError>;

/// Commission in cents for a settled amount, rounded to the nearest cent.
pub fn commission_cents(amount_cents: i64, rate: f64) -> i64 {
    (amount_cents as f64 * rate).round() as i64
}
