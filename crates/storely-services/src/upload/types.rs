//! Types used by the upload coordinator

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use storely_core::constants::{CHUNK_URL_TTL, DEFAULT_STORAGE_LIMIT_BYTES};
use storely_core::models::FileRecord;
use storely_core::{Config, StorageBackend};
use storely_storage::ByteStream;
use uuid::Uuid;

/// Coordinator settings injected at construction
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Limit given to an owner's quota account the first time they are seen
    pub default_storage_limit_bytes: i64,
    /// Backend used when a session does not ask for one
    pub default_backend: StorageBackend,
    /// Lifetime of presigned chunk URLs
    pub url_ttl: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            default_storage_limit_bytes: DEFAULT_STORAGE_LIMIT_BYTES,
            default_backend: StorageBackend::Object,
            url_ttl: CHUNK_URL_TTL,
        }
    }
}

impl UploadSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_storage_limit_bytes: config.default_storage_limit_bytes(),
            default_backend: config.default_chunk_backend(),
            url_ttl: CHUNK_URL_TTL,
        }
    }
}

/// Parameters of a new upload session
#[derive(Debug, Clone)]
pub struct InitSession {
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub declared_size: i64,
    pub total_chunks: u32,
    /// `None` picks the configured default
    pub backend: Option<StorageBackend>,
}

/// Presigned PUT credential for one chunk object
#[derive(Debug, Clone)]
pub struct ChunkCredential {
    pub chunk_index: u32,
    pub url: String,
    pub object_key: String,
}

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub record: FileRecord,
    /// One per chunk index for object-backed sessions, empty otherwise
    pub credentials: Vec<ChunkCredential>,
    pub expires_at: DateTime<Utc>,
}

/// A chunk delivered through the server
#[derive(Debug, Clone)]
pub struct IngestChunk {
    /// `None` opens a document-backed session from this chunk's metadata
    pub file_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub data: Bytes,
    pub content_type: String,
    pub file_name: String,
}

/// A complete file ready to be streamed to the caller
pub struct FileDownload {
    pub record: FileRecord,
    /// Chunk payloads in ascending index order
    pub stream: ByteStream,
}
