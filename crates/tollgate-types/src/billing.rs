//! Orders, packages and purchase history.

use serde::{Deserialize, Serialize};

/// Payment order state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Unpaid,
    Paid,
}

impl OrderStatus {
    /// Stored integer representation (0 = unpaid, 1 = paid).
    pub fn as_i64(self) -> i64 {
        match self {
            OrderStatus::Unpaid => 0,
            OrderStatus::Paid => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(OrderStatus::Unpaid),
            1 => Some(OrderStatus::Paid),
            _ => None,
        }
    }
}

/// A payment order awaiting gateway settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub account_id: i64,
    /// Amount in cents.
    pub amount: i64,
    pub status: OrderStatus,
    /// Gateway transaction number, set when paid.
    pub trade_no: Option<String>,
    pub created_at: u64,
}

/// A purchasable package. `content` holds the opaque benefit JSON parsed at
/// the settlement boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: i64,
    pub name: String,
    /// Price in cents.
    pub price: i64,
    pub content: String,
    pub active: bool,
}

/// An append-only purchase history row, written only inside the settlement
/// transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub account_id: i64,
    pub package_id: i64,
    /// Price paid in cents.
    pub price: i64,
    /// Class expiry granted by this purchase (0 = none).
    pub renew_at: u64,
    pub created_at: u64,
}
