//! Historical log tables, trimmed by the weekly clean job.

use rusqlite::Connection;

use crate::Result;

/// Append one traffic-report item to the log.
pub fn append_traffic(
    conn: &Connection,
    account_id: i64,
    node_id: i64,
    uploaded: u64,
    downloaded: u64,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO traffic_log (account_id, node_id, uploaded, downloaded, logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![account_id, node_id, uploaded as i64, downloaded as i64, now as i64],
    )?;
    Ok(())
}

/// Append one node online-count sample to the log.
pub fn append_online(conn: &Connection, node_id: i64, online_count: u32, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO node_online_log (node_id, online_count, logged_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![node_id, online_count as i64, now as i64],
    )?;
    Ok(())
}

/// Delete log rows older than `cutoff`. Returns (traffic rows, online rows)
/// deleted.
pub fn trim(conn: &Connection, cutoff: u64) -> Result<(usize, usize)> {
    let traffic = conn.execute("DELETE FROM traffic_log WHERE logged_at < ?1", [cutoff as i64])?;
    let online = conn.execute(
        "DELETE FROM node_online_log WHERE logged_at < ?1",
        [cutoff as i64],
    )?;
    Ok((traffic, online))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_trim_keeps_recent_rows() {
        let conn = test_db();
        append_traffic(&conn, 1, 2, 10, 20, 100).expect("old");
        append_traffic(&conn, 1, 2, 10, 20, 900).expect("new");
        append_online(&conn, 2, 5, 100).expect("old");
        append_online(&conn, 2, 6, 900).expect("new");

        let (traffic, online) = trim(&conn, 500).expect("trim");
        assert_eq!((traffic, online), (1, 1));

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM traffic_log", [], |row| row.get(0))
            .expect("count");
        assert_eq!(remaining, 1);
    }
}
