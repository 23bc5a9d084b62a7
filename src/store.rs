use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use thiserror::Error;

/// Persistent record of alerts that have already been pushed.
///
/// One SQLite file, one table. Each mutating operation is a single statement,
/// so a crash mid-write never leaves a partial record visible. A single
/// process instance at a time is assumed; there is no file locking for
/// concurrent invocations.
#[derive(Debug)]
pub struct SeenStore {
    conn: Connection,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seen-alert store not found at {}; run with --init to create it", path.display())]
    Uninitialized { path: PathBuf },

    #[error("alert {0} is already recorded")]
    DuplicateRecord(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl SeenStore {
    /// One-time setup: create the store file and schema. Safe to call on an
    /// existing store.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an existing store. Refuses to run against a missing file so a
    /// mistyped path cannot silently start an empty history; the schema is
    /// still re-applied, which is a no-op on a healthy store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::Uninitialized {
                path: path.to_path_buf(),
            });
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS seen_alerts (
                alert_id    TEXT PRIMARY KEY,
                recorded_at INTEGER NOT NULL,
                expires_at  INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_seen_alerts_expires ON seen_alerts(expires_at)",
            [],
        )?;

        Ok(())
    }

    /// True iff this alert has already been recorded as pushed.
    pub fn exists(&self, alert_id: &str) -> Result<bool, StoreError> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM seen_alerts WHERE alert_id = ?1)",
            params![alert_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Insert a seen record. Returns [`StoreError::DuplicateRecord`] if the
    /// identifier is already present; callers are expected to check
    /// [`SeenStore::exists`] first, and a duplicate insert leaves the table
    /// untouched.
    pub fn record(
        &self,
        alert_id: &str,
        recorded_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO seen_alerts (alert_id, recorded_at, expires_at) VALUES (?1, ?2, ?3)",
            params![
                alert_id,
                recorded_at.timestamp(),
                expires_at.map(|t| t.timestamp())
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateRecord(alert_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every record unconditionally. Irreversible. Returns the number
    /// of records cleared.
    pub fn purge(&self) -> Result<usize, StoreError> {
        let cleared = self.conn.execute("DELETE FROM seen_alerts", [])?;
        Ok(cleared)
    }

    /// Drop records whose alert expired before `cutoff`. Records without an
    /// expiry are kept forever.
    pub fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM seen_alerts WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![cutoff.timestamp()],
        )?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seen_alerts", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
