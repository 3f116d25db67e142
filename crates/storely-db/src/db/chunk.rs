use storely_core::models::{ChunkRecord, NewChunk};
use storely_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Trait for chunk ledger operations
///
/// The ledger records which chunk indices of a file have landed. Re-delivery of an
/// index replaces the existing row, so counts are always over distinct indices.
#[async_trait::async_trait]
pub trait ChunkLedger: Send + Sync {
    /// Insert or replace the row for `(file_id, chunk_index)`.
    async fn upsert_chunk(&self, chunk: NewChunk) -> Result<(), AppError>;

    /// Number of distinct chunk indices recorded for the file.
    async fn count_chunks(&self, file_id: Uuid) -> Result<u32, AppError>;

    /// Recorded chunk indices in ascending order.
    async fn present_indices(&self, file_id: Uuid) -> Result<Vec<u32>, AppError>;

    /// All rows for the file, ordered by chunk index.
    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, AppError>;

    /// Remove every row for the file and return how many were removed.
    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, AppError>;
}

/// Repository for the chunk ledger
#[derive(Clone)]
pub struct ChunkRepository {
    pool: PgPool,
}

impl ChunkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChunkLedger for ChunkRepository {
    #[tracing::instrument(
        skip(self, chunk),
        fields(db.table = "file_chunks", file_id = %chunk.file_id, chunk_index = chunk.chunk_index)
    )]
    async fn upsert_chunk(&self, chunk: NewChunk) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO file_chunks (file_id, chunk_index, total_chunks, payload, size, content_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (file_id, chunk_index) DO UPDATE
            SET total_chunks = EXCLUDED.total_chunks,
                payload = EXCLUDED.payload,
                size = EXCLUDED.size,
                content_type = EXCLUDED.content_type,
                uploaded_at = NOW()
            "#,
        )
        .bind(chunk.file_id)
        .bind(chunk.chunk_index)
        .bind(chunk.total_chunks)
        .bind(chunk.payload)
        .bind(chunk.size)
        .bind(chunk.content_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_chunks", file_id = %file_id))]
    async fn count_chunks(&self, file_id: Uuid) -> Result<u32, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT chunk_index) FROM file_chunks WHERE file_id = $1",
        )
        .bind(file_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u32)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_chunks", file_id = %file_id))]
    async fn present_indices(&self, file_id: Uuid) -> Result<Vec<u32>, AppError> {
        let indices: Vec<i32> = sqlx::query_scalar(
            "SELECT DISTINCT chunk_index FROM file_chunks WHERE file_id = $1 ORDER BY chunk_index",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(indices.into_iter().map(|i| i.max(0) as u32).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_chunks", file_id = %file_id))]
    async fn get_chunks(&self, file_id: Uuid) -> Result<Vec<ChunkRecord>, AppError> {
        let rows = sqlx::query_as::<Postgres, ChunkRecord>(
            r#"
            SELECT file_id, chunk_index, total_chunks, payload, size, content_type, uploaded_at
            FROM file_chunks
            WHERE file_id = $1
            ORDER BY chunk_index
            "#,
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_chunks", file_id = %file_id))]
    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM file_chunks WHERE file_id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
