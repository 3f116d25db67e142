//! Chunked upload coordination
//!
//! Session init → chunk ingestion through a per-session [`ChunkSink`] → finalize →
//! retrieval or delete. Files move `Pending` → `Complete` → removed, never back.

pub mod coordinator;
pub mod sink;
pub mod types;

#[cfg(all(test, feature = "storage-local"))]
mod tests;

pub use coordinator::UploadCoordinator;
pub use sink::{ChunkSink, DocumentChunkSink, ObjectChunkSink};
pub use types::{ChunkCredential, FileDownload, IngestChunk, InitSession, UploadSession, UploadSettings};
