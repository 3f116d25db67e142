//! Upload coordinator
//!
//! Owns the per-file state machine. There is no per-file lock: completeness is
//! re-derived from a fresh presence count after every write and marking a file
//! complete is idempotent, so concurrent and out-of-order chunks are safe.
//! Backend failures abort the operation without compensating rollback.

use std::sync::Arc;

use chrono::Utc;
use storely_core::constants::{MAX_FILE_NAME_LEN, MAX_TOTAL_CHUNKS};
use storely_core::models::{
    ChunkDownloadUrl, ChunkUploadResponse, DeleteFileResponse, DownloadLinksResponse, FileRecord,
    FinalizeResponse, NewFileRecord, ProgressResponse, StorageHealth,
};
use storely_core::{AppError, StorageBackend};
use storely_db::{ChunkLedger, FileRecordStore, QuotaLedger};
use storely_storage::keys::chunk_keys;
use storely_storage::Storage;
use uuid::Uuid;

use super::sink::{missing_indices, ChunkSink, DocumentChunkSink, ObjectChunkSink};
use super::types::{
    ChunkCredential, FileDownload, IngestChunk, InitSession, UploadSession, UploadSettings,
};

/// Orchestrates quota, file records, chunk sinks and the storage gateway
pub struct UploadCoordinator {
    files: Arc<dyn FileRecordStore>,
    chunks: Arc<dyn ChunkLedger>,
    quota: Arc<dyn QuotaLedger>,
    storage: Arc<dyn Storage>,
    document_sink: DocumentChunkSink,
    object_sink: ObjectChunkSink,
    settings: UploadSettings,
}

impl UploadCoordinator {
    pub fn new(
        files: Arc<dyn FileRecordStore>,
        chunks: Arc<dyn ChunkLedger>,
        quota: Arc<dyn QuotaLedger>,
        storage: Arc<dyn Storage>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            document_sink: DocumentChunkSink::new(chunks.clone()),
            object_sink: ObjectChunkSink::new(storage.clone(), chunks.clone()),
            files,
            chunks,
            quota,
            storage,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    fn sink_for(&self, backend: StorageBackend) -> &dyn ChunkSink {
        match backend {
            StorageBackend::Document => &self.document_sink,
            StorageBackend::Object => &self.object_sink,
        }
    }

    async fn load(&self, file_id: Uuid) -> Result<FileRecord, AppError> {
        self.files
            .get(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    /// Open a session: reserve quota, create the pending record and, for
    /// object-backed sessions, mint one presigned PUT per chunk.
    ///
    /// Quota exhaustion fails before anything is written. A presign failure after
    /// the record exists leaves it Pending with its quota still reserved.
    pub async fn init_session(&self, request: InitSession) -> Result<UploadSession, AppError> {
        validate_session(&request)?;

        let backend = request.backend.unwrap_or(self.settings.default_backend);
        let owner_id = request.owner_id;

        self.quota
            .ensure_account(owner_id, self.settings.default_storage_limit_bytes)
            .await?;
        self.quota.reserve(owner_id, request.declared_size).await?;

        let bucket_name = match backend {
            StorageBackend::Object => self.storage.bucket().map(String::from),
            StorageBackend::Document => None,
        };

        let record = self
            .files
            .create(NewFileRecord {
                id: Uuid::new_v4(),
                owner_id,
                file_name: request.file_name.trim().to_string(),
                file_type: request.file_type,
                declared_size: request.declared_size,
                total_chunks: request.total_chunks as i32,
                storage_backend: backend,
                bucket_name,
            })
            .await?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.settings.url_ttl)
                .map_err(|e| AppError::Internal(format!("Invalid URL TTL: {}", e)))?;

        let mut credentials = Vec::new();
        if backend == StorageBackend::Object {
            credentials.reserve(request.total_chunks as usize);
            for (chunk_index, object_key) in chunk_keys(record.id, request.total_chunks) {
                let url = self
                    .storage
                    .presigned_put_url(&object_key, &record.file_type, self.settings.url_ttl)
                    .await
                    .map_err(|e| {
                        tracing::warn!(
                            error = %e,
                            file_id = %record.id,
                            owner_id = %owner_id,
                            chunk_index = chunk_index,
                            "Failed to presign chunk upload; session left pending"
                        );
                        AppError::from(e)
                    })?;
                credentials.push(ChunkCredential {
                    chunk_index,
                    url,
                    object_key,
                });
            }
        }

        tracing::info!(
            file_id = %record.id,
            owner_id = %owner_id,
            total_chunks = request.total_chunks,
            declared_size = request.declared_size,
            backend = %backend,
            "Upload session opened"
        );

        Ok(UploadSession {
            record,
            credentials,
            expires_at,
        })
    }

    /// Accept one chunk through the server.
    ///
    /// Without a `file_id` a document-backed session is opened from this chunk,
    /// reserving `len(chunk) * total_chunks` bytes.
    pub async fn ingest_chunk(&self, chunk: IngestChunk) -> Result<ChunkUploadResponse, AppError> {
        if chunk.data.is_empty() {
            return Err(AppError::InvalidInput("Chunk payload is empty".to_string()));
        }
        if chunk.chunk_index >= chunk.total_chunks {
            return Err(AppError::InvalidInput(format!(
                "Chunk index {} out of range for {} chunks",
                chunk.chunk_index, chunk.total_chunks
            )));
        }

        let record = match chunk.file_id {
            Some(file_id) => self.load(file_id).await?,
            None => self.open_session_from_chunk(&chunk).await?,
        };

        if record.owner_id != chunk.owner_id {
            tracing::warn!(
                file_id = %record.id,
                owner_id = %record.owner_id,
                requester_id = %chunk.owner_id,
                "Chunk refused for non-owner"
            );
            return Err(AppError::Forbidden(
                "Only the file owner can upload chunks to this file".to_string(),
            ));
        }

        if chunk.total_chunks as i32 != record.total_chunks {
            return Err(AppError::InvalidInput(format!(
                "Total chunks {} does not match the session's {}",
                chunk.total_chunks, record.total_chunks
            )));
        }

        let size = chunk.data.len();
        self.sink_for(record.storage_backend)
            .write(&record, chunk.chunk_index, chunk.data, &chunk.content_type)
            .await?;

        let chunks_received = self.chunks.count_chunks(record.id).await?;
        let total = record.chunk_count();

        tracing::debug!(
            file_id = %record.id,
            chunk_index = chunk.chunk_index,
            size_bytes = size,
            chunks_received = chunks_received,
            total_chunks = total,
            "Chunk stored"
        );

        if chunks_received >= total && !record.complete {
            self.files.mark_complete(record.id).await?;
            tracing::info!(file_id = %record.id, "All chunks received, file complete");
        }

        Ok(ChunkUploadResponse {
            file_id: record.id,
            file_name: record.file_name,
            file_type: record.file_type,
            total_chunks: total,
            chunks_received,
        })
    }

    async fn open_session_from_chunk(&self, chunk: &IngestChunk) -> Result<FileRecord, AppError> {
        let declared_size = (chunk.data.len() as i64)
            .checked_mul(chunk.total_chunks as i64)
            .ok_or_else(|| AppError::InvalidInput("Estimated file size overflows".to_string()))?;

        let session = self
            .init_session(InitSession {
                owner_id: chunk.owner_id,
                file_name: chunk.file_name.clone(),
                file_type: chunk.content_type.clone(),
                declared_size,
                total_chunks: chunk.total_chunks,
                backend: Some(StorageBackend::Document),
            })
            .await?;

        Ok(session.record)
    }

    /// Verify every chunk is present and mark the file complete.
    pub async fn finalize(&self, file_id: Uuid) -> Result<FinalizeResponse, AppError> {
        let record = self.load(file_id).await?;

        if !record.complete {
            let total = record.chunk_count();
            let present = self
                .sink_for(record.storage_backend)
                .present_indices(&record)
                .await?;
            let missing = missing_indices(total, &present);

            if !missing.is_empty() {
                tracing::debug!(
                    file_id = %file_id,
                    missing = missing.len(),
                    total_chunks = total,
                    "Finalize refused, chunks missing"
                );
                return Err(AppError::MissingChunks { missing, total });
            }

            self.files.mark_complete(file_id).await?;
            tracing::info!(file_id = %file_id, "Upload finalized");
        }

        Ok(FinalizeResponse {
            status: "success".to_string(),
            file_id,
        })
    }

    /// Chunks confirmed present so far. Never mutates.
    pub async fn progress(&self, file_id: Uuid) -> Result<ProgressResponse, AppError> {
        let record = self.load(file_id).await?;
        let total = record.chunk_count();

        let chunks_received = if record.complete {
            total
        } else {
            self.sink_for(record.storage_backend)
                .present_indices(&record)
                .await?
                .len() as u32
        };

        Ok(ProgressResponse {
            file_id,
            total_chunks: total,
            chunks_received,
            complete: record.complete,
        })
    }

    pub async fn get_file(&self, file_id: Uuid) -> Result<FileRecord, AppError> {
        self.load(file_id).await
    }

    /// Files of an owner, newest first.
    pub async fn list_files(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        self.files.list_by_owner(owner_id).await
    }

    /// Remove a file's chunks and record, then give its declared size back to the owner.
    pub async fn delete_file(
        &self,
        file_id: Uuid,
        requester_id: Uuid,
    ) -> Result<DeleteFileResponse, AppError> {
        let record = self.load(file_id).await?;

        if record.owner_id != requester_id {
            tracing::warn!(
                file_id = %file_id,
                owner_id = %record.owner_id,
                requester_id = %requester_id,
                "Delete refused for non-owner"
            );
            return Err(AppError::Forbidden(
                "Only the file owner can delete this file".to_string(),
            ));
        }

        self.sink_for(record.storage_backend)
            .purge(&record)
            .await?;

        if !self.files.delete(file_id).await? {
            // A concurrent delete won; it releases the quota.
            return Err(AppError::NotFound(format!("File {} not found", file_id)));
        }

        let account = self
            .quota
            .release(record.owner_id, record.declared_size)
            .await?;

        tracing::info!(
            file_id = %file_id,
            owner_id = %record.owner_id,
            released = record.declared_size,
            storage_used = account.storage_used,
            "File deleted"
        );

        Ok(DeleteFileResponse {
            status: "deleted".to_string(),
            file_id,
        })
    }

    /// Stream a complete file through the server in chunk order.
    pub async fn download(&self, file_id: Uuid) -> Result<FileDownload, AppError> {
        let record = self.load(file_id).await?;
        if !record.complete {
            return Err(AppError::NotComplete(format!(
                "File {} is still uploading",
                file_id
            )));
        }

        let stream = self
            .sink_for(record.storage_backend)
            .open(&record)
            .await?;

        Ok(FileDownload { record, stream })
    }

    /// Presigned GET URLs for every chunk of a complete object-backed file.
    pub async fn download_links(&self, file_id: Uuid) -> Result<DownloadLinksResponse, AppError> {
        let record = self.load(file_id).await?;

        if record.storage_backend != StorageBackend::Object {
            return Err(AppError::BadRequest(
                "Direct download links are only available for object-backed files".to_string(),
            ));
        }
        if !record.complete {
            return Err(AppError::NotComplete(format!(
                "File {} is still uploading",
                file_id
            )));
        }

        let total = record.chunk_count();
        let present = self.object_sink.present_indices(&record).await?;
        let missing = missing_indices(total, &present);
        if !missing.is_empty() {
            return Err(AppError::MissingChunks { missing, total });
        }

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.settings.url_ttl)
                .map_err(|e| AppError::Internal(format!("Invalid URL TTL: {}", e)))?;

        let mut chunks = Vec::with_capacity(total as usize);
        for (chunk_index, key) in chunk_keys(record.id, total) {
            let url = self
                .storage
                .get_presigned_url(&key, self.settings.url_ttl)
                .await?;
            chunks.push(ChunkDownloadUrl { chunk_index, url });
        }

        Ok(DownloadLinksResponse {
            file_id,
            file_name: record.file_name,
            file_type: record.file_type,
            total_chunks: total,
            declared_size: record.declared_size,
            chunks,
            expires_at,
        })
    }

    /// Quota snapshot for `owner_id`, visible only to that owner.
    pub async fn storage_health(
        &self,
        owner_id: Uuid,
        requester_id: Uuid,
    ) -> Result<StorageHealth, AppError> {
        if owner_id != requester_id {
            return Err(AppError::Forbidden(
                "Storage health is only visible to its owner".to_string(),
            ));
        }

        let account = self
            .quota
            .ensure_account(owner_id, self.settings.default_storage_limit_bytes)
            .await?;

        Ok(StorageHealth::from(&account))
    }
}

fn validate_session(request: &InitSession) -> Result<(), AppError> {
    if request.total_chunks == 0 || request.total_chunks > MAX_TOTAL_CHUNKS {
        return Err(AppError::InvalidInput(format!(
            "Total chunks must be between 1 and {}",
            MAX_TOTAL_CHUNKS
        )));
    }
    if request.declared_size < 0 {
        return Err(AppError::InvalidInput(
            "File size must not be negative".to_string(),
        ));
    }
    let name = request.file_name.trim();
    if name.is_empty() || name.chars().count() as u64 > MAX_FILE_NAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "File name must be between 1 and {} characters",
            MAX_FILE_NAME_LEN
        )));
    }
    Ok(())
}
