use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage_types::StorageBackend;

/// Lifecycle of a file. `Removed` is represented by the record being absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Complete,
}

/// Per-file metadata entity created at session init.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub declared_size: i64,
    pub total_chunks: i32,
    pub complete: bool,
    pub storage_backend: StorageBackend,
    pub bucket_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn status(&self) -> FileStatus {
        if self.complete {
            FileStatus::Complete
        } else {
            FileStatus::Pending
        }
    }

    /// Number of chunks as an index bound. Records never hold a negative count.
    pub fn chunk_count(&self) -> u32 {
        self.total_chunks.max(0) as u32
    }
}

/// Values needed to insert a new `FileRecord`; timestamps and `complete` are set by the store.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub declared_size: i64,
    pub total_chunks: i32,
    pub storage_backend: StorageBackend,
    pub bucket_name: Option<String>,
}

impl NewFileRecord {
    pub fn into_record(self, now: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id: self.id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            file_type: self.file_type,
            declared_size: self.declared_size,
            total_chunks: self.total_chunks,
            complete: false,
            storage_backend: self.storage_backend,
            bucket_name: self.bucket_name,
            created_at: now,
            updated_at: now,
        }
    }
}
