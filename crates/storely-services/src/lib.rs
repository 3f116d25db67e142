//! Storely Services Layer
//!
//! This crate is the **business service layer**: it hosts the upload coordinator
//! that drives sessions, chunk ingestion, completion and retrieval, and re-exports
//! the storage gateway so that the API crate depends on a single service facade.
//! Keep business logic and coordination here; keep thin HTTP handling in storely-api.

pub mod upload;

pub use storely_storage::{
    chunk_key, create_storage, ByteStream, ObjectStoreKind, Storage, StorageError, StorageResult,
};
#[cfg(feature = "storage-local")]
pub use storely_storage::{factory::create_local_storage, LocalStorage};
#[cfg(feature = "storage-s3")]
pub use storely_storage::S3Storage;
pub use upload::{
    ChunkSink, DocumentChunkSink, FileDownload, IngestChunk, InitSession, ObjectChunkSink,
    UploadCoordinator, UploadSession, UploadSettings,
};
