//! Chunk sinks
//!
//! A session writes, verifies, reads back and purges its chunks through exactly one
//! sink, chosen from the record's `storage_backend`. Nothing is written to both backends.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use storely_core::models::{FileRecord, NewChunk};
use storely_core::AppError;
use storely_db::ChunkLedger;
use storely_storage::keys::chunk_keys;
use storely_storage::{chunk_key, ByteStream, Storage, StorageError};

/// Concurrent object stats issued while checking chunk presence.
const PRESENCE_CHECK_CONCURRENCY: usize = 16;

#[async_trait]
pub trait ChunkSink: Send + Sync {
    /// Store one chunk. Re-delivery of an index replaces the previous payload.
    async fn write(
        &self,
        record: &FileRecord,
        chunk_index: u32,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), AppError>;

    /// Indices confirmed present, ascending.
    async fn present_indices(&self, record: &FileRecord) -> Result<Vec<u32>, AppError>;

    /// Concatenated payload in ascending index order. The file must be complete.
    async fn open(&self, record: &FileRecord) -> Result<ByteStream, AppError>;

    /// Remove every chunk of the file.
    async fn purge(&self, record: &FileRecord) -> Result<(), AppError>;
}

/// Keeps chunk payloads in the chunk ledger
#[derive(Clone)]
pub struct DocumentChunkSink {
    chunks: Arc<dyn ChunkLedger>,
}

impl DocumentChunkSink {
    pub fn new(chunks: Arc<dyn ChunkLedger>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl ChunkSink for DocumentChunkSink {
    async fn write(
        &self,
        record: &FileRecord,
        chunk_index: u32,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.chunks
            .upsert_chunk(NewChunk {
                file_id: record.id,
                chunk_index: chunk_index as i32,
                total_chunks: record.total_chunks,
                size: data.len() as i64,
                payload: Some(data.to_vec()),
                content_type: content_type.to_string(),
            })
            .await
    }

    async fn present_indices(&self, record: &FileRecord) -> Result<Vec<u32>, AppError> {
        self.chunks.present_indices(record.id).await
    }

    async fn open(&self, record: &FileRecord) -> Result<ByteStream, AppError> {
        let total = record.chunk_count();
        let chunks = self.chunks.get_chunks(record.id).await?;

        let present: Vec<u32> = chunks.iter().map(|c| c.chunk_index.max(0) as u32).collect();
        let missing = missing_indices(total, &present);
        if !missing.is_empty() || chunks.len() != total as usize {
            tracing::error!(
                file_id = %record.id,
                missing = ?missing,
                "Complete file has gaps in its chunk ledger"
            );
            return Err(AppError::MissingChunks { missing, total });
        }

        let mut parts: Vec<Result<Bytes, StorageError>> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let payload = chunk.payload.ok_or_else(|| {
                AppError::Internal(format!(
                    "Chunk {} of file {} has no stored payload",
                    chunk.chunk_index, record.id
                ))
            })?;
            parts.push(Ok(Bytes::from(payload)));
        }

        Ok(Box::pin(stream::iter(parts)))
    }

    async fn purge(&self, record: &FileRecord) -> Result<(), AppError> {
        let removed = self.chunks.delete_chunks(record.id).await?;
        tracing::debug!(file_id = %record.id, removed = removed, "Removed ledger chunks");
        Ok(())
    }
}

/// Keeps chunk payloads in the object store at `{file_id}/chunk_{index}`
#[derive(Clone)]
pub struct ObjectChunkSink {
    storage: Arc<dyn Storage>,
    chunks: Arc<dyn ChunkLedger>,
}

impl ObjectChunkSink {
    pub fn new(storage: Arc<dyn Storage>, chunks: Arc<dyn ChunkLedger>) -> Self {
        Self { storage, chunks }
    }
}

#[async_trait]
impl ChunkSink for ObjectChunkSink {
    async fn write(
        &self,
        record: &FileRecord,
        chunk_index: u32,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), AppError> {
        let key = chunk_key(record.id, chunk_index);
        let size = data.len() as i64;

        self.storage
            .upload_with_key(&key, data, content_type)
            .await?;

        // The object stays if this fails; a retry of the chunk overwrites both.
        self.chunks
            .upsert_chunk(NewChunk {
                file_id: record.id,
                chunk_index: chunk_index as i32,
                total_chunks: record.total_chunks,
                payload: None,
                size,
                content_type: content_type.to_string(),
            })
            .await
    }

    async fn present_indices(&self, record: &FileRecord) -> Result<Vec<u32>, AppError> {
        let storage = self.storage.clone();
        let results: Vec<(u32, bool)> = stream::iter(chunk_keys(record.id, record.chunk_count()))
            .map(|(index, key)| {
                let storage = storage.clone();
                async move { storage.exists(&key).await.map(|found| (index, found)) }
            })
            .buffered(PRESENCE_CHECK_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(results
            .into_iter()
            .filter_map(|(index, found)| found.then_some(index))
            .collect())
    }

    async fn open(&self, record: &FileRecord) -> Result<ByteStream, AppError> {
        let storage = self.storage.clone();
        let keys: Vec<String> = chunk_keys(record.id, record.chunk_count())
            .map(|(_, key)| key)
            .collect();

        // Objects are opened one at a time as the previous one drains.
        let body = stream::iter(keys)
            .then(move |key| {
                let storage = storage.clone();
                async move { storage.download_stream(&key).await }
            })
            .try_flatten();

        Ok(Box::pin(body))
    }

    async fn purge(&self, record: &FileRecord) -> Result<(), AppError> {
        for (index, key) in chunk_keys(record.id, record.chunk_count()) {
            self.storage.delete(&key).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    file_id = %record.id,
                    chunk_index = index,
                    "Chunk object delete failed, aborting purge"
                );
                AppError::from(e)
            })?;
        }

        self.chunks.delete_chunks(record.id).await?;
        Ok(())
    }
}

/// Indices in `[0, total)` absent from `present`.
pub(crate) fn missing_indices(total: u32, present: &[u32]) -> Vec<u32> {
    let mut seen = vec![false; total as usize];
    for &index in present {
        if let Some(slot) = seen.get_mut(index as usize) {
            *slot = true;
        }
    }
    seen.iter()
        .enumerate()
        .filter_map(|(index, found)| (!found).then_some(index as u32))
        .collect()
}
