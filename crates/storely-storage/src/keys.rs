//! Shared key generation for storage backends.
//!
//! Key format: `{file_id}/chunk_{index}`.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Object key of one chunk of a file. All backends and clients rely on this layout.
pub fn chunk_key(file_id: Uuid, chunk_index: u32) -> String {
    format!("{}/chunk_{}", file_id, chunk_index)
}

/// Keys for every chunk of a file, in index order.
pub fn chunk_keys(file_id: Uuid, total_chunks: u32) -> impl Iterator<Item = (u32, String)> {
    (0..total_chunks).map(move |i| (i, chunk_key(file_id, i)))
}

/// Reject keys that are empty, absolute, or try to walk out of the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
