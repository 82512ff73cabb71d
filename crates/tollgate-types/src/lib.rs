//! # tollgate-types
//!
//! Shared domain types for the Tollgate metered-access core.
//!
//! Conventions used across the workspace:
//! - Timestamps are Unix epoch seconds (`u64`).
//! - Traffic values are bytes (`u64`).
//! - Money values are integer cents (`i64`); balances may go negative.
//!
//! ## Modules
//!
//! - [`account`] — subscriber accounts and their quota/lifecycle fields
//! - [`node`] — reporting backend nodes
//! - [`report`] — inbound node report payloads
//! - [`billing`] — orders, packages, purchase history
//! - [`referral`] — referral commission ledger entries
//! - [`limits`] — contractual numeric thresholds

pub mod account;
pub mod billing;
pub mod limits;
pub mod node;
pub mod referral;
pub mod report;

pub use account::Account;
pub use billing::{Order, OrderStatus, Package, Purchase};
pub use node::Node;
pub use referral::{ReferralEntry, ReferralKind};
pub use report::{OnlineReport, ReportItem, ReportSummary, TrafficReport};

/// One gibibyte in bytes.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// One hour in seconds.
pub const HOUR_SECS: u64 = 3600;

/// One day in seconds.
pub const DAY_SECS: u64 = 86_400;
