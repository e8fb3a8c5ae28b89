//! Durable queue store: a named snapshot of the live queue in SQLite.
//!
//! `save` drains the queue into the store; `load` restores it and deletes
//! the saved copy. One snapshot per store name, owned by one claim holder
//! at a time.

mod claim;
mod db;
mod records;


pub use claim::{StoreBusy, StoreClaim};
pub use db::QueueStore;
pub use records::StoredRecord;
