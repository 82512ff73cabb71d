//! Package benefit content.
//!
//! Packages carry an opaque JSON document describing what a purchase
//! grants. It is parsed here, at the settlement boundary, into an explicit
//! struct. Missing fields default to "no change"; unknown field names are
//! rejected rather than silently ignored.

use serde::{Deserialize, Serialize};
use tollgate_types::GIB;

use crate::{Result, SettleError};

/// Parsed package benefits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageContent {
    /// Traffic grant in GiB. May be fractional. 0 = no grant.
    #[serde(default)]
    pub traffic: f64,
    /// Service class to set. `None` = keep the current class.
    #[serde(default)]
    pub class: Option<u32>,
    /// Days added to the class expiry. 0 = unchanged.
    #[serde(default)]
    pub class_expire: u64,
    /// Days added to the account expiry. 0 = unchanged.
    #[serde(default)]
    pub expire_in: u64,
    /// Zero both traffic counters on settlement.
    #[serde(default)]
    pub reset_traffic: bool,
}

impl PackageContent {
    /// Parse a package's content JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        let content: PackageContent =
            serde_json::from_str(raw).map_err(|e| SettleError::InvalidContent(e.to_string()))?;
        if content.traffic < 0.0 {
            return Err(SettleError::InvalidContent(
                "traffic grant cannot be negative".into(),
            ));
        }
        Ok(content)
    }

    /// Traffic grant in bytes.
    pub fn traffic_bytes(&self) -> u64 {
        (self.traffic * GIB as f64) as u64
    }
}
