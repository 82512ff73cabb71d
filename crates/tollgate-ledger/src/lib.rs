//! # tollgate-ledger
//!
//! The traffic ledger and its consumers.
//!
//! ## Modules
//!
//! - [`report`] — applies node traffic/online/heartbeat reports with
//!   relative counter updates
//! - [`overuse`] — windowed usage detection against cached baselines

pub mod overuse;
pub mod report;

pub use overuse::{ScanSummary, Window};
pub use report::apply_report;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The reporting node itself is not registered. Per-item failures never
    /// raise this; only the node lookup does.
    #[error("node not found: {0}")]
    NodeNotFound(i64),

    #[error("database error: {0}")]
    Db(#[from] tollgate_db::DbError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
