//! Repository and coordinator wiring

use crate::state::{AppState, DbState, ObjectState, UploadState};
use sqlx::PgPool;
use std::sync::Arc;
use storely_core::Config;
use storely_db::{ChunkRepository, FileRecordRepository, QuotaRepository};
use storely_services::{UploadCoordinator, UploadSettings};

/// Build the application state on top of the PostgreSQL ledgers
pub fn initialize_services(config: &Config, pool: PgPool, objects: ObjectState) -> Arc<AppState> {
    let coordinator = UploadCoordinator::new(
        Arc::new(FileRecordRepository::new(pool.clone())),
        Arc::new(ChunkRepository::new(pool.clone())),
        Arc::new(QuotaRepository::new(pool.clone())),
        objects.storage.clone(),
        UploadSettings::from_config(config),
    );

    tracing::info!(
        default_backend = %config.default_chunk_backend(),
        default_storage_limit_bytes = config.default_storage_limit_bytes(),
        "Upload coordinator initialized"
    );

    Arc::new(AppState {
        upload: UploadState {
            coordinator: Arc::new(coordinator),
            max_chunk_size_bytes: config.max_chunk_size_bytes(),
        },
        objects,
        db: DbState { pool: Some(pool) },
    })
}
