//! Database repositories for data access layer
//!
//! Each ledger module holds its trait and the PostgreSQL repository implementing it.
//! `memory` holds the in-memory implementations of all three ledgers.

pub mod chunk;
pub mod file;
pub mod memory;
pub mod quota;

pub use chunk::{ChunkLedger, ChunkRepository};
pub use file::{FileRecordRepository, FileRecordStore};
pub use memory::{InMemoryChunkLedger, InMemoryFileRecordStore, InMemoryQuotaLedger};
pub use quota::{QuotaLedger, QuotaRepository};
