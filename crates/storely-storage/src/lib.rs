//! Storely Storage Library
//!
//! This crate is the object storage gateway for Storely. It provides the Storage
//! trait and implementations for S3-compatible stores and the local filesystem.
//!
//! # Storage key format
//!
//! Chunk objects are stored under `{file_id}/chunk_{index}` (zero-based, contiguous).
//! The layout is a durable external contract shared with direct-upload clients and
//! is produced only by [`keys::chunk_key`].
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::chunk_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use storely_core::ObjectStoreKind;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
