//! Storely DB Library
//!
//! Ledgers backing the upload coordinator: file records, chunk presence and
//! per-owner quota. Each ledger is a trait with a PostgreSQL repository and an
//! in-memory implementation used by tests and local tooling.

pub mod db;

pub use db::{
    ChunkLedger, ChunkRepository, FileRecordRepository, FileRecordStore, InMemoryChunkLedger,
    InMemoryFileRecordStore, InMemoryQuotaLedger, QuotaLedger, QuotaRepository,
};

/// Embedded SQL migrations from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
