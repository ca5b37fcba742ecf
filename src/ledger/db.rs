//! SQLite store for the command-frequency ledger.
//!
//! One relational table keyed by `(command, context)`. WAL mode lets the
//! single writer task and concurrent readers share the database safely.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;

/// Ledger database wrapper
#[derive(Clone)]
pub struct LedgerDb {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerDb {
    /// Open or create the ledger at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open ledger db: {}", path.display()))?;

        // WAL for read-while-write access from suggestion queries
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory ledger for tests and ephemeral sessions
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection (for queries)
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Ledger DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Upsert one `(command, context)` observation: frequency starts at 1
    /// and increments monotonically, never decrements.
    pub fn record(&self, command: &str, context: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        self.conn().execute(
            r#"INSERT INTO commands (command, context, frequency, first_seen, last_used)
               VALUES (?1, ?2, 1, ?3, ?3)
               ON CONFLICT(command, context) DO UPDATE SET
                   frequency = frequency + 1, last_used = ?3"#,
            rusqlite::params![command, context, now],
        )?;
        Ok(())
    }

    /// Purge rows unused for longer than `older_than_days`. Returns the
    /// number of rows deleted.
    pub fn cleanup(&self, older_than_days: i64) -> Result<usize> {
        let cutoff = Utc::now().timestamp_millis() - older_than_days * 24 * 60 * 60 * 1000;
        let deleted = self.conn().execute(
            "DELETE FROM commands WHERE last_used < ?1",
            rusqlite::params![cutoff],
        )?;
        Ok(deleted)
    }

    /// Current frequency for a `(command, context)` key, 0 when absent
    pub fn frequency(&self, command: &str, context: &str) -> Result<i64> {
        let conn = self.conn();
        match conn.query_row(
            "SELECT frequency FROM commands WHERE command = ?1 AND context = ?2",
            rusqlite::params![command, context],
            |row| row.get(0),
        ) {
            Ok(freq) => Ok(freq),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// SQL schema for the ledger database
const SCHEMA_SQL: &str = r#"
-- Learned command frequencies, bucketed by derived context.
-- The context is a bounded derived string, never raw command output.
CREATE TABLE IF NOT EXISTS commands (
    command TEXT NOT NULL,
    context TEXT NOT NULL,
    frequency INTEGER NOT NULL DEFAULT 0,
    first_seen INTEGER NOT NULL,
    last_used INTEGER NOT NULL,
    PRIMARY KEY (command, context)
);
CREATE INDEX IF NOT EXISTS idx_commands_context_freq ON commands(context, frequency DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_and_init() {
        let dir = tempdir().unwrap();
        let db = LedgerDb::open(&dir.path().join("ledger.db")).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"commands".to_string()));
    }

    #[test]
    fn record_increments_frequency() {
        let db = LedgerDb::open_in_memory().unwrap();
        db.record("ls", "linux:~").unwrap();
        db.record("ls", "linux:~").unwrap();
        db.record("ls", "linux:~").unwrap();
        db.record("ls", "linux:/tmp").unwrap();

        assert_eq!(db.frequency("ls", "linux:~").unwrap(), 3);
        assert_eq!(db.frequency("ls", "linux:/tmp").unwrap(), 1);
        assert_eq!(db.frequency("pwd", "linux:~").unwrap(), 0);
    }

    #[test]
    fn frequency_propagates_query_errors() {
        let db = LedgerDb::open_in_memory().unwrap();
        db.conn().execute_batch("DROP TABLE commands").unwrap();
        assert!(db.frequency("ls", "ctx").is_err());
    }

    #[test]
    fn cleanup_purges_only_stale_rows() {
        let db = LedgerDb::open_in_memory().unwrap();
        db.record("ls", "linux:~").unwrap();
        db.record("df -h", "linux:~").unwrap();

        // Age one row beyond the retention window
        let stale = Utc::now().timestamp_millis() - 40 * 24 * 60 * 60 * 1000;
        db.conn()
            .execute(
                "UPDATE commands SET last_used = ?1 WHERE command = 'df -h'",
                rusqlite::params![stale],
            )
            .unwrap();

        let deleted = db.cleanup(30).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.frequency("ls", "linux:~").unwrap(), 1);
        assert_eq!(db.frequency("df -h", "linux:~").unwrap(), 0);
    }
}
