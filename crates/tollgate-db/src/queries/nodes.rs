//! Node query functions.

use rusqlite::{Connection, OptionalExtension};
use tollgate_types::Node;

use crate::{DbError, Result};

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        name: row.get(1)?,
        bandwidth_used: row.get::<_, i64>(2)? as u64,
        bandwidth_limit: row.get::<_, i64>(3)? as u64,
        last_heartbeat_at: row.get::<_, i64>(4)? as u64,
        online_count: row.get::<_, i64>(5)? as u32,
        visible: row.get::<_, i64>(6)? != 0,
        node_group: row.get::<_, i64>(7)? as u32,
        required_class: row.get::<_, i64>(8)? as u32,
    })
}

/// Fetch one node.
pub fn get(conn: &Connection, id: i64) -> Result<Node> {
    conn.query_row(
        "SELECT id, name, bandwidth_used, bandwidth_limit, last_heartbeat_at,
                online_count, visible, node_group, required_class
         FROM nodes WHERE id = ?1",
        [id],
        row_to_node,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("node {id}")))
}

/// Whether a node row exists.
pub fn exists(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM nodes WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Insert a node with an explicit id.
pub fn insert(conn: &Connection, node: &Node) -> Result<()> {
    conn.execute(
        "INSERT INTO nodes (id, name, bandwidth_used, bandwidth_limit,
             last_heartbeat_at, online_count, visible, node_group, required_class)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            node.id,
            node.name,
            node.bandwidth_used as i64,
            node.bandwidth_limit as i64,
            node.last_heartbeat_at as i64,
            node.online_count as i64,
            node.visible as i64,
            node.node_group as i64,
            node.required_class as i64,
        ],
    )?;
    Ok(())
}

/// Atomically add relayed bytes to a node and refresh its heartbeat.
pub fn add_bandwidth(conn: &Connection, id: i64, bytes: u64, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE nodes
         SET bandwidth_used = bandwidth_used + ?1, last_heartbeat_at = ?2
         WHERE id = ?3",
        rusqlite::params![bytes as i64, now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("node {id}")));
    }
    Ok(())
}

/// Refresh a node's heartbeat timestamp only.
pub fn touch_heartbeat(conn: &Connection, id: i64, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE nodes SET last_heartbeat_at = ?1 WHERE id = ?2",
        rusqlite::params![now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("node {id}")));
    }
    Ok(())
}

/// Persist an online-count report and refresh the heartbeat.
pub fn set_online(conn: &Connection, id: i64, online_count: u32, now: u64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE nodes SET online_count = ?1, last_heartbeat_at = ?2 WHERE id = ?3",
        rusqlite::params![online_count as i64, now as i64, id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("node {id}")));
    }
    Ok(())
}

/// Hide visible nodes whose heartbeat predates `cutoff`. Returns the number
/// hidden.
pub fn hide_stale(conn: &Connection, cutoff: u64) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE nodes SET visible = 0 WHERE visible = 1 AND last_heartbeat_at < ?1",
        [cutoff as i64],
    )?;
    Ok(updated)
}
