use std::{fs, path::Path, path::PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

pub const DB_FILE_NAME: &str = "PropertyTenancy.sqlite3";

pub fn db_path(dir: &Path) -> StoreResult<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(DB_FILE_NAME))
}

pub fn open_connection(dir: &Path) -> StoreResult<Connection> {
    let path = db_path(dir)?;
    let conn = Connection::open(&path).map_err(|source| StoreError::Open {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "opened tenancy database");
    Ok(conn)
}

/// Applies pragmas and creates any missing tables. Safe to run on every
/// open.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    // addressId carries no REFERENCES clause: deleting an address leaves
    // tenancies pointing at it, and reads tolerate the dangling id.
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS addresses (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          title TEXT NOT NULL DEFAULT '',
          line1 TEXT NOT NULL DEFAULT '',
          line2 TEXT NOT NULL DEFAULT '',
          city TEXT NOT NULL DEFAULT '',
          state TEXT NOT NULL DEFAULT '',
          pinCode TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS tenancies (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL DEFAULT '',
          contact TEXT NOT NULL DEFAULT '',
          addressId INTEGER,
          leaseStartDate TEXT NOT NULL,
          leaseAgreementSigned INTEGER NOT NULL DEFAULT 0,
          advanceAmount REAL NOT NULL DEFAULT 0,
          agreedRent REAL NOT NULL DEFAULT 0,
          monthlyDueDate INTEGER NOT NULL DEFAULT 1,
          agreementSignedDate TEXT NOT NULL,
          comments TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS rent_payments (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          tenancyId INTEGER NOT NULL,
          amount REAL NOT NULL,
          paidOn TEXT NOT NULL,
          notes TEXT NOT NULL DEFAULT '',
          FOREIGN KEY(tenancyId) REFERENCES tenancies(id)
        );
        CREATE INDEX IF NOT EXISTS idx_rent_payments_tenancy
          ON rent_payments (tenancyId, paidOn DESC, id DESC);",
    )?;

    ensure_tenancy_columns(conn)?;
    Ok(())
}

// Databases written before rent tracking have tenancies without the rent
// columns.
fn ensure_tenancy_columns(conn: &Connection) -> rusqlite::Result<()> {
    if !table_has_column(conn, "tenancies", "agreedRent")? {
        debug!("adding tenancies.agreedRent");
        conn.execute(
            "ALTER TABLE tenancies ADD COLUMN agreedRent REAL NOT NULL DEFAULT 0",
            [],
        )?;
    }
    if !table_has_column(conn, "tenancies", "monthlyDueDate")? {
        debug!("adding tenancies.monthlyDueDate");
        conn.execute(
            "ALTER TABLE tenancies ADD COLUMN monthlyDueDate INTEGER NOT NULL DEFAULT 1",
            [],
        )?;
    }
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory");
        init_db(&conn).expect("first init");
        init_db(&conn).expect("second init");
        assert!(table_has_column(&conn, "rent_payments", "paidOn").expect("table_info"));
    }

    #[test]
    fn migrates_tenancies_without_rent_columns() {
        let conn = Connection::open_in_memory().expect("open in-memory");
        conn.execute_batch(
            "CREATE TABLE tenancies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT '',
                contact TEXT NOT NULL DEFAULT '',
                addressId INTEGER,
                leaseStartDate TEXT NOT NULL,
                leaseAgreementSigned INTEGER NOT NULL DEFAULT 0,
                advanceAmount REAL NOT NULL DEFAULT 0,
                agreementSignedDate TEXT NOT NULL,
                comments TEXT NOT NULL DEFAULT ''
            );
            INSERT INTO tenancies (name, leaseStartDate, agreementSignedDate)
            VALUES ('Old', '2023-01-01 00:00:00', '2023-01-01 00:00:00');",
        )
        .expect("create legacy schema");

        init_db(&conn).expect("init");

        let (rent, due): (f64, i64) = conn
            .query_row(
                "SELECT agreedRent, monthlyDueDate FROM tenancies WHERE name = 'Old'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("legacy row");
        assert_eq!(rent, 0.0);
        assert_eq!(due, 1);
    }
}
