//! Reporting backend nodes.

use serde::{Deserialize, Serialize};

/// A backend node that consumes quota on behalf of accounts and
/// periodically reports usage and health.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    /// Cumulative bytes relayed by this node.
    pub bandwidth_used: u64,
    /// Monthly bandwidth cap (0 = unlimited).
    pub bandwidth_limit: u64,
    /// Last heartbeat or traffic report (0 = never).
    pub last_heartbeat_at: u64,
    /// Online account count from the last load report.
    pub online_count: u32,
    /// Visible to subscribers. Flipped off when the heartbeat goes stale.
    pub visible: bool,
    /// Group this node serves (0 = all groups).
    pub node_group: u32,
    /// Minimum service class required to use this node.
    pub required_class: u32,
}

impl Node {
    /// Whether the node's heartbeat is older than `stale_after` seconds.
    pub fn is_stale(&self, now: u64, stale_after: u64) -> bool {
        now.saturating_sub(self.last_heartbeat_at) > stale_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(last_heartbeat_at: u64) -> Node {
        Node {
            id: 1,
            name: "edge-1".into(),
            bandwidth_used: 0,
            bandwidth_limit: 0,
            last_heartbeat_at,
            online_count: 0,
            visible: true,
            node_group: 0,
            required_class: 0,
        }
    }

    #[test]
    fn test_fresh_heartbeat_not_stale() {
        assert!(!node(10_000).is_stale(10_100, 7200));
    }

    #[test]
    fn test_old_heartbeat_stale() {
        assert!(node(1_000).is_stale(10_000, 7200));
    }

    #[test]
    fn test_boundary_is_not_stale() {
        // Exactly at the threshold counts as alive.
        assert!(!node(1_000).is_stale(1_000 + 7200, 7200));
    }
}
