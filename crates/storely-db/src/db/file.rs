use storely_core::models::{FileRecord, NewFileRecord};
use storely_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Trait for file record operations
/// This abstracts the database implementation (PostgreSQL or in-memory)
#[async_trait::async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert a new pending record.
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;

    /// Set `complete = true`. Idempotent; returns false when the record does not exist.
    async fn mark_complete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Remove the record. Returns false when it was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Records of an owner, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError>;
}

const FILE_COLUMNS: &str = "id, owner_id, file_name, file_type, declared_size, total_chunks, \
     complete, storage_backend, bucket_name, created_at, updated_at";

/// Repository for file records
#[derive(Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FileRecordStore for FileRecordRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "file_records", db.record_id = %record.id))]
    async fn create(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        let query = format!(
            r#"
            INSERT INTO file_records (
                id, owner_id, file_name, file_type, declared_size, total_chunks,
                complete, storage_backend, bucket_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8)
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, FileRecord>(&query)
            .bind(record.id)
            .bind(record.owner_id)
            .bind(record.file_name)
            .bind(record.file_type)
            .bind(record.declared_size)
            .bind(record.total_chunks)
            .bind(record.storage_backend)
            .bind(record.bucket_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let query = format!("SELECT {} FROM file_records WHERE id = $1", FILE_COLUMNS);
        let row = sqlx::query_as::<Postgres, FileRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.record_id = %id))]
    async fn mark_complete(&self, id: Uuid) -> Result<bool, AppError> {
        // updated_at only moves on the Pending -> Complete transition
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET complete = TRUE,
                updated_at = CASE WHEN complete THEN updated_at ELSE NOW() END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM file_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records", owner_id = %owner_id))]
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM file_records WHERE owner_id = $1 ORDER BY created_at DESC, id",
            FILE_COLUMNS
        );
        let rows = sqlx::query_as::<Postgres, FileRecord>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
