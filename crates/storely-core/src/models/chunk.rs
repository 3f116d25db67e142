use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One row of the chunk ledger. Unique per `(file_id, chunk_index)`.
///
/// `payload` is only populated for document-backed files; object-backed rows
/// record that the index landed while the bytes live in the object store.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ChunkRecord {
    pub file_id: Uuid,
    pub chunk_index: i32,
    pub total_chunks: i32,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
    pub size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A chunk about to be written to the ledger.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub file_id: Uuid,
    pub chunk_index: i32,
    pub total_chunks: i32,
    pub payload: Option<Vec<u8>>,
    pub size: i64,
    pub content_type: String,
}

impl NewChunk {
    pub fn into_record(self, uploaded_at: DateTime<Utc>) -> ChunkRecord {
        ChunkRecord {
            file_id: self.file_id,
            chunk_index: self.chunk_index,
            total_chunks: self.total_chunks,
            payload: self.payload,
            size: self.size,
            content_type: self.content_type,
            uploaded_at,
        }
    }
}
