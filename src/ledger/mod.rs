//! Durable frequency ledger of `(command, context)` pairs

mod db;
mod writer;

pub use db::LedgerDb;
pub use writer::LedgerWriter;
