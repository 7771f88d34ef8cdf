//! SQLite persistence for addresses, tenancies and rent payments.
//!
//! [`Store`] owns a single connection. It is `Send` but not `Sync`: callers
//! that share it across threads must serialize access themselves.

mod address;
mod payment;
mod tenancy;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{types::Type, Connection, Row};
use tracing::{info, warn};

use crate::dates::DatePolicy;
use crate::db;
use crate::error::{StoreError, StoreResult};

pub struct Store {
    conn: Connection,
    location: Option<PathBuf>,
    date_policy: DatePolicy,
}

impl Store {
    /// Opens (creating if needed) the database inside `dir`.
    pub fn open(dir: &Path, date_policy: DatePolicy) -> StoreResult<Self> {
        let conn = db::open_connection(dir)?;
        init_schema(&conn, dir)?;
        Ok(Self {
            conn,
            location: Some(dir.to_path_buf()),
            date_policy,
        })
    }

    pub fn open_in_memory(date_policy: DatePolicy) -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        init_schema(&conn, Path::new(":memory:"))?;
        Ok(Self {
            conn,
            location: None,
            date_policy,
        })
    }

    /// Directory holding the database file, `None` for in-memory stores.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn date_policy(&self) -> DatePolicy {
        self.date_policy
    }

    /// Moves the store to a new directory. The new connection is opened and
    /// its schema created before the old one is closed, so a failure leaves
    /// the store usable at its previous location.
    pub fn relocate(&mut self, dir: &Path) -> StoreResult<()> {
        if self.location.as_deref() == Some(dir) {
            return Ok(());
        }

        let conn = db::open_connection(dir)?;
        init_schema(&conn, dir)?;

        let previous = std::mem::replace(&mut self.conn, conn);
        if let Err((_, err)) = previous.close() {
            warn!(error = %err, "failed to close previous database connection");
        }

        info!(path = %dir.display(), "relocated tenancy database");
        self.location = Some(dir.to_path_buf());
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn init_schema(conn: &Connection, path: &Path) -> StoreResult<()> {
    db::init_db(conn).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a date column, applying the store's policy to unparseable text.
pub(crate) fn read_date(row: &Row<'_>, idx: usize, policy: DatePolicy) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    policy
        .resolve(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn read_bool(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    let flag: i64 = row.get(idx)?;
    Ok(flag != 0)
}

pub(crate) fn fetch_failed(entity: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |source| StoreError::FetchFailed { entity, source }
}
