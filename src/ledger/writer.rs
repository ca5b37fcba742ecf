//! Single-writer queue in front of the ledger database.
//!
//! All mutations funnel through one ordered queue drained by one task, so
//! concurrent `record` calls never race on the same row. A failed write is
//! logged and the queue continues; losing a learning write never takes
//! down a session. Reads bypass the queue entirely.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::db::LedgerDb;

enum WriteOp {
    Record { command: String, context: String },
    Flush(oneshot::Sender<()>),
}

/// Handle for queueing ledger writes. Cheap to clone; all clones feed the
/// same ordered queue.
#[derive(Clone)]
pub struct LedgerWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl LedgerWriter {
    /// Start the writer task draining into `db`
    pub fn spawn(db: LedgerDb) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Record { command, context } => {
                        if let Err(e) = db.record(&command, &context) {
                            warn!("Ledger write failed for '{command}': {e}");
                        }
                    }
                    WriteOp::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("Ledger writer queue drained; task exiting");
        });

        Self { tx }
    }

    /// Queue one `(command, context)` observation. Fire-and-forget: errors
    /// surface only in the writer task's log.
    pub fn record(&self, command: &str, context: &str) {
        let _ = self.tx.send(WriteOp::Record {
            command: command.to_string(),
            context: context.to_string(),
        });
    }

    /// Wait until every write queued before this call has been applied
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_records_are_applied_in_order() {
        let db = LedgerDb::open_in_memory().unwrap();
        let writer = LedgerWriter::spawn(db.clone());

        writer.record("ls", "ctx");
        writer.record("ls", "ctx");
        writer.record("ls", "ctx");
        writer.flush().await;

        assert_eq!(db.frequency("ls", "ctx").unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_writers_never_lose_counts() {
        let db = LedgerDb::open_in_memory().unwrap();
        let writer = LedgerWriter::spawn(db.clone());

        let a = writer.clone();
        let b = writer.clone();
        let ha = tokio::spawn(async move {
            a.record("ls", "ctx");
            a.record("ls", "ctx");
        });
        let hb = tokio::spawn(async move {
            b.record("ls", "ctx");
        });
        ha.await.unwrap();
        hb.await.unwrap();
        writer.flush().await;

        assert_eq!(db.frequency("ls", "ctx").unwrap(), 3);
    }
}
