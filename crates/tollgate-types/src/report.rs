//! Inbound node report payloads.
//!
//! These mirror the wire shapes nodes send. Field names on the wire are the
//! short legacy ones (`user_id`, `u`, `d`); the Rust fields spell them out.

use serde::{Deserialize, Serialize};

/// One account's traffic delta within a node report. Ephemeral — applied,
/// never persisted as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    #[serde(rename = "user_id")]
    pub account_id: i64,
    #[serde(rename = "u")]
    pub upload_bytes: u64,
    #[serde(rename = "d")]
    pub download_bytes: u64,
}

impl ReportItem {
    /// Total bytes carried by this item.
    pub fn total_bytes(&self) -> u64 {
        self.upload_bytes.saturating_add(self.download_bytes)
    }
}

/// A batch traffic report from one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficReport {
    pub node_id: i64,
    pub data: Vec<ReportItem>,
}

/// Outcome of applying a traffic report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub node_id: i64,
    /// Accounts whose counters were actually incremented.
    pub updated_count: usize,
    /// Sum of all deltas applied, including items for unknown accounts.
    #[serde(rename = "total_traffic")]
    pub total_bytes: u64,
}

/// An online-count/load report from one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnlineReport {
    pub node_id: i64,
    #[serde(rename = "online")]
    pub online_count: u32,
    #[serde(default)]
    pub load: Option<String>,
}
