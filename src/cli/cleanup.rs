//! Ledger retention sweep

use anyhow::Result;

use aerie::config::Settings;
use aerie::ledger::LedgerDb;

pub fn cleanup_command(settings: Settings, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(settings.retention_days);
    let db = LedgerDb::open(&settings.ledger_db_path())?;
    let deleted = db.cleanup(days)?;
    println!("Purged {deleted} command(s) unused for more than {days} day(s).");
    Ok(())
}
