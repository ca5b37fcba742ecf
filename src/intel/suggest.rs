//! Ranked command suggestions backed by the ledger.
//!
//! Reads go straight to the database, bypassing the writer queue; WAL
//! mode keeps them safe against the concurrent writer. Every method is
//! total: a query failure is logged and yields an empty result.

use anyhow::Result;
use tracing::warn;

use crate::ledger::LedgerDb;

/// A ranked suggestion with its observed frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCommand {
    pub command: String,
    pub frequency: i64,
}

/// Read-side view over the command ledger
#[derive(Clone)]
pub struct Suggestions {
    db: LedgerDb,
}

impl Suggestions {
    pub fn new(db: LedgerDb) -> Self {
        Self { db }
    }

    /// Up to `n` commands for `context`, most frequent first; ties break
    /// toward the most recently inserted row.
    pub fn suggest(&self, context: &str, n: usize) -> Vec<String> {
        self.suggest_ranked(context, n)
            .into_iter()
            .map(|r| r.command)
            .collect()
    }

    /// `suggest` with frequencies attached
    pub fn suggest_ranked(&self, context: &str, n: usize) -> Vec<RankedCommand> {
        self.total(|| {
            let conn = self.db.conn();
            let mut stmt = conn.prepare(
                "SELECT command, frequency FROM commands WHERE context = ?1
                 ORDER BY frequency DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![context, n as i64], |row| {
                    Ok(RankedCommand {
                        command: row.get(0)?,
                        frequency: row.get(1)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Up to `n` commands starting with `prefix`, ranked by total
    /// frequency across contexts.
    pub fn suggest_by_prefix(&self, prefix: &str, n: usize) -> Vec<String> {
        self.total(|| {
            let conn = self.db.conn();
            let mut stmt = conn.prepare(
                "SELECT command FROM commands WHERE command LIKE ?1 ESCAPE '\\'
                 GROUP BY command ORDER BY SUM(frequency) DESC, MAX(rowid) DESC LIMIT ?2",
            )?;
            let pattern = format!("{}%", escape_like(prefix));
            let rows = stmt
                .query_map(rusqlite::params![pattern, n as i64], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// The `n` most used commands across all contexts
    pub fn popular(&self, n: usize) -> Vec<String> {
        self.total(|| {
            let conn = self.db.conn();
            let mut stmt = conn.prepare(
                "SELECT command FROM commands GROUP BY command
                 ORDER BY SUM(frequency) DESC, MAX(rowid) DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![n as i64], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Distinct contexts a command has been used in
    pub fn contexts_for(&self, command: &str) -> Vec<String> {
        self.total(|| {
            let conn = self.db.conn();
            let mut stmt =
                conn.prepare("SELECT DISTINCT context FROM commands WHERE command = ?1")?;
            let rows = stmt
                .query_map(rusqlite::params![command], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    fn total<T: Default>(&self, query: impl FnOnce() -> Result<T>) -> T {
        match query() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Suggestion query failed: {e}");
                T::default()
            }
        }
    }
}

/// Escape SQL LIKE wildcards in user-supplied prefixes
fn escape_like(s: &str) -> String {
    s.replace('\\', r"\\").replace('%', r"\%").replace('_', r"\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (LedgerDb, Suggestions) {
        let db = LedgerDb::open_in_memory().unwrap();
        for _ in 0..3 {
            db.record("ls -la", "linux:~").unwrap();
        }
        for _ in 0..5 {
            db.record("df -h", "linux:~").unwrap();
        }
        db.record("uptime", "linux:~").unwrap();
        db.record("ls -la", "linux:/tmp").unwrap();
        let suggestions = Suggestions::new(db.clone());
        (db, suggestions)
    }

    #[test]
    fn suggestions_ranked_by_frequency() {
        let (_db, s) = seeded();
        assert_eq!(s.suggest("linux:~", 10), vec!["df -h", "ls -la", "uptime"]);
    }

    #[test]
    fn suggestions_never_exceed_n_and_are_non_increasing() {
        let (_db, s) = seeded();
        let ranked = s.suggest_ranked("linux:~", 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].frequency >= ranked[1].frequency);
    }

    #[test]
    fn frequency_ties_break_toward_most_recent_insertion() {
        let db = LedgerDb::open_in_memory().unwrap();
        db.record("first", "ctx").unwrap();
        db.record("second", "ctx").unwrap();
        let s = Suggestions::new(db);
        assert_eq!(s.suggest("ctx", 10), vec!["second", "first"]);
    }

    #[test]
    fn prefix_search_sums_across_contexts() {
        let (_db, s) = seeded();
        assert_eq!(s.suggest_by_prefix("ls", 10), vec!["ls -la"]);
        assert!(s.suggest_by_prefix("zzz", 10).is_empty());
    }

    #[test]
    fn prefix_wildcards_are_literal() {
        let db = LedgerDb::open_in_memory().unwrap();
        db.record("grep -r pattern", "ctx").unwrap();
        let s = Suggestions::new(db);
        assert!(s.suggest_by_prefix("%", 10).is_empty());
    }

    #[test]
    fn popular_spans_contexts() {
        let (_db, s) = seeded();
        // ls -la: 3 + 1 across two contexts; df -h: 5
        assert_eq!(s.popular(2), vec!["df -h", "ls -la"]);
    }

    #[test]
    fn contexts_for_lists_buckets() {
        let (_db, s) = seeded();
        let mut contexts = s.contexts_for("ls -la");
        contexts.sort();
        assert_eq!(contexts, vec!["linux:/tmp", "linux:~"]);
    }

    #[test]
    fn empty_context_is_total_not_error() {
        let db = LedgerDb::open_in_memory().unwrap();
        let s = Suggestions::new(db);
        assert!(s.suggest("nothing", 5).is_empty());
    }
}
