//! Object storage setup

use crate::state::ObjectState;
use anyhow::{Context, Result};
use std::sync::Arc;
use storely_core::Config;
use storely_services::{create_local_storage, create_storage, ObjectStoreKind, Storage};

/// Build the storage gateway selected by `STORAGE_BACKEND`.
pub async fn setup_storage(config: &Config) -> Result<ObjectState> {
    let objects = match config.object_store() {
        ObjectStoreKind::Local => {
            let local = Arc::new(
                create_local_storage(config)
                    .await
                    .context("Failed to initialize local storage")?,
            );
            let storage: Arc<dyn Storage> = local.clone();
            ObjectState {
                storage,
                local: Some(local),
            }
        }
        ObjectStoreKind::S3 => ObjectState {
            storage: create_storage(config)
                .await
                .context("Failed to initialize S3 storage")?,
            local: None,
        },
    };

    tracing::info!(
        backend = %objects.storage.backend_type(),
        bucket = objects.storage.bucket().unwrap_or("-"),
        "Object storage initialized"
    );

    Ok(objects)
}
