//! Referral commission ledger entries.

use serde::{Deserialize, Serialize};

/// What a ledger entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralKind {
    /// Purchase commission credited to the referrer.
    Commission,
    /// One-time bonus credited when the referred account registered.
    SignupBonus,
    /// Reversal of a signup bonus after the referred account was banned.
    Recovery,
}

impl ReferralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferralKind::Commission => "commission",
            ReferralKind::SignupBonus => "signup_bonus",
            ReferralKind::Recovery => "recovery",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "commission" => Some(ReferralKind::Commission),
            "signup_bonus" => Some(ReferralKind::SignupBonus),
            "recovery" => Some(ReferralKind::Recovery),
            _ => None,
        }
    }
}

/// One row of the referral commission ledger.
///
/// A recovery entry's `amount` is exactly the negation of the entry it
/// reverses, and an entry is flagged `recovered` at most once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEntry {
    pub id: i64,
    /// The referred account that triggered the entry.
    pub account_id: i64,
    pub referrer_id: i64,
    /// Settlement order that produced a commission entry. `None` for signup
    /// bonuses and recoveries.
    pub order_id: Option<i64>,
    pub kind: ReferralKind,
    /// Cents. Negative for recoveries.
    pub amount: i64,
    pub recovered: bool,
    pub recorded_at: u64,
}
