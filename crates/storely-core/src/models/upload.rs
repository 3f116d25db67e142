use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{DEFAULT_CONTENT_TYPE, MAX_FILE_NAME_LEN, MAX_TOTAL_CHUNKS};
use crate::models::{FileRecord, FileStatus};
use crate::storage_types::StorageBackend;

/// Request to open an upload session
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    /// Original file name
    #[validate(length(
        min = 1,
        max = MAX_FILE_NAME_LEN,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Content type (MIME type)
    #[serde(default = "default_file_type")]
    #[validate(length(max = 255, message = "File type must be at most 255 characters"))]
    pub file_type: String,
    /// Declared file size in bytes, reserved against the owner's quota
    #[validate(range(min = 0, message = "File size must not be negative"))]
    pub file_size: i64,
    /// Number of chunks the file is split into
    #[validate(range(
        min = 1,
        max = MAX_TOTAL_CHUNKS,
        message = "Total chunks must be between 1 and 10000"
    ))]
    pub total_chunks: u32,
    /// Where chunk payloads are kept; defaults to the server's configured backend
    #[serde(default)]
    pub storage_backend: Option<StorageBackend>,
}

fn default_file_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Presigned PUT credential for one chunk
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadUrl {
    pub chunk_index: u32,
    pub upload_url: String,
    pub object_key: String,
}

/// Response to session init
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub file_id: Uuid,
    pub storage_backend: StorageBackend,
    /// One credential per chunk index; empty for document-backed sessions
    pub upload_urls: Vec<ChunkUploadUrl>,
    /// Endpoint to call once every chunk has been PUT
    pub callback_url: String,
    /// Instant the upload credentials stop working
    pub expires_at: DateTime<Utc>,
}

/// Response to a proxied chunk upload
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadResponse {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub total_chunks: u32,
    pub chunks_received: u32,
}

/// Response to a successful finalize
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub status: String,
    pub file_id: Uuid,
}

/// Upload progress for a file
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub file_id: Uuid,
    pub total_chunks: u32,
    pub chunks_received: u32,
    pub complete: bool,
}

/// Presigned GET credential for one chunk
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDownloadUrl {
    pub chunk_index: u32,
    pub url: String,
}

/// Direct download manifest; the caller fetches and concatenates chunks in index order
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinksResponse {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub total_chunks: u32,
    pub declared_size: i64,
    pub chunks: Vec<ChunkDownloadUrl>,
    pub expires_at: DateTime<Utc>,
}

/// Response to a delete
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResponse {
    pub status: String,
    pub file_id: Uuid,
}

/// File metadata as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub declared_size: i64,
    pub total_chunks: u32,
    pub status: FileStatus,
    pub storage_backend: StorageBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        FileResponse {
            id: record.id,
            owner_id: record.owner_id,
            total_chunks: record.chunk_count(),
            status: record.status(),
            file_name: record.file_name,
            file_type: record.file_type,
            declared_size: record.declared_size,
            storage_backend: record.storage_backend,
            bucket_name: record.bucket_name,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
