//! Query functions, grouped by table family.
//!
//! All functions take a `&Connection` and stay transaction-agnostic: callers
//! that need atomicity across several calls wrap them in their own
//! `rusqlite::Transaction`.

pub mod accounts;
pub mod logs;
pub mod nodes;
pub mod orders;
pub mod packages;
pub mod referral;
