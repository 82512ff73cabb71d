//! # tollgate-settle
//!
//! Purchase settlement: package content parsing, the atomic settlement
//! transaction, and payment-callback processing.
//!
//! ## Modules
//!
//! - [`content`] — the opaque package benefit JSON, parsed into a
//!   defaulted struct at the settlement boundary
//! - [`settle`] — the all-or-nothing purchase transaction
//! - [`payment`] — order creation and gateway callback handling

pub mod content;
pub mod payment;
pub mod settle;

pub use content::PackageContent;
pub use payment::{create_order, process_payment, PaymentOutcome};
pub use settle::{settle, Settlement};

/// Error types for settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    #[error("account not found: {0}")]
    AccountNotFound(i64),

    #[error("package not found: {0}")]
    PackageNotFound(i64),

    #[error("order not found: {0}")]
    OrderNotFound(i64),

    #[error("package {0} is not for sale")]
    PackageInactive(i64),

    /// Settlement precondition failure; no mutation occurred.
    #[error("insufficient balance: have {balance_cents}, need {price_cents}")]
    InsufficientFunds { balance_cents: i64, price_cents: i64 },

    #[error("invalid package content: {0}")]
    InvalidContent(String),

    #[error("database error: {0}")]
    Db(#[from] tollgate_db::DbError),

    #[error("transaction error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("referral error: {0}")]
    Referral(#[from] tollgate_referral::ReferralError),
}

pub type Result<T> = std::result::Result<T, SettleError>;
