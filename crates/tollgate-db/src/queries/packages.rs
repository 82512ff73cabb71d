//! Package and purchase-history query functions.

use rusqlite::{Connection, OptionalExtension};
use tollgate_types::{Package, Purchase};

use crate::{DbError, Result};

/// Fetch one package.
pub fn get(conn: &Connection, id: i64) -> Result<Package> {
    conn.query_row(
        "SELECT id, name, price, content, active FROM packages WHERE id = ?1",
        [id],
        |row| {
            Ok(Package {
                id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                content: row.get(3)?,
                active: row.get::<_, i64>(4)? != 0,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("package {id}")))
}

/// Insert a package and return its id.
pub fn insert(
    conn: &Connection,
    name: &str,
    price_cents: i64,
    content: &str,
    active: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO packages (name, price, content, active) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, price_cents, content, active as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append a purchase-history row. Only the settlement transaction writes
/// here.
pub fn record_purchase(
    conn: &Connection,
    account_id: i64,
    package_id: i64,
    price_cents: i64,
    renew_at: u64,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO purchases (account_id, package_id, price, renew_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![account_id, package_id, price_cents, renew_at as i64, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List an account's purchase history, newest first.
pub fn purchase_history(conn: &Connection, account_id: i64, limit: u32) -> Result<Vec<Purchase>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, package_id, price, renew_at, created_at
         FROM purchases WHERE account_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![account_id, limit], |row| {
            Ok(Purchase {
                id: row.get(0)?,
                account_id: row.get(1)?,
                package_id: row.get(2)?,
                price: row.get(3)?,
                renew_at: row.get::<_, i64>(4)? as u64,
                created_at: row.get::<_, i64>(5)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::accounts;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open test db");
        accounts::insert(&conn, &accounts::tests::sample_account(1)).expect("account");
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let id = insert(&conn, "starter", 990, r#"{"traffic":10}"#, true).expect("insert");
        let package = get(&conn, id).expect("get");
        assert_eq!(package.name, "starter");
        assert_eq!(package.price, 990);
        assert!(package.active);
    }

    #[test]
    fn test_purchase_history_newest_first() {
        let conn = test_db();
        let package = insert(&conn, "starter", 990, "{}", true).expect("package");
        record_purchase(&conn, 1, package, 990, 0, 100).expect("first");
        record_purchase(&conn, 1, package, 990, 0, 200).expect("second");

        let history = purchase_history(&conn, 1, 10).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at, 200);
        assert_eq!(history[1].created_at, 100);
    }
}
