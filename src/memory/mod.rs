//! Persistence: long-term memory, daily journal, and project ledgers

mod journal;
mod project;
mod store;

pub use journal::Journal;
pub use project::{LEDGER_FILE, ProjectLedger};
pub use store::{DbPool, Memory, MemoryStore};
