//! # tollgate-jobs
//!
//! The four periodic lifecycle jobs and the scheduler that runs them.
//!
//! Jobs are synchronous functions over a database connection and the
//! snapshot cache; the scheduler wraps them in async tasks. Every job is
//! built from independent steps: a failing step is logged and the job
//! moves on to the next step, so one bad account or table never blocks the
//! rest of a run, and a failed run never blocks the next scheduled one.
//!
//! ## Modules
//!
//! - [`scheduler`] — single-instance, coalescing periodic runner
//! - [`daily`] — renewal rollover, node staleness, daily overuse, idle
//!   cleanup, counter snapshots, class expiry
//! - [`hourly`] — hourly overuse, stale unpaid orders
//! - [`check`] — transient-state purge, never-used cleanup, negative
//!   balance penalties
//! - [`clean`] — weekly historical log trim

pub mod check;
pub mod clean;
pub mod daily;
pub mod hourly;
pub mod scheduler;

pub use scheduler::{JobSpec, Scheduler};

/// Error types for job execution. These stop a single step, not the job,
/// and never the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Db(#[from] tollgate_db::DbError),

    #[error("transaction error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] tollgate_ledger::LedgerError),

    #[error("referral error: {0}")]
    Referral(#[from] tollgate_referral::ReferralError),
}

pub type Result<T> = std::result::Result<T, JobError>;

/// Run one job step, logging instead of propagating its failure. Returns
/// the step's count, or 0 when it failed.
fn run_step(job: &str, step: &str, result: Result<usize>) -> usize {
    match result {
        Ok(count) => {
            tracing::info!(job, step, count, "job step complete");
            count
        }
        Err(e) => {
            tracing::error!(job, step, error = %e, "job step failed, continuing");
            0
        }
    }
}
