//! Application state and sub-state extractors.
//!
//! Handlers extract only the sub-state they need via Axum's `FromRef`.

use std::sync::Arc;

use sqlx::PgPool;
use storely_services::{LocalStorage, Storage, UploadCoordinator};

/// Upload coordinator and the limits applied before it is called.
#[derive(Clone)]
pub struct UploadState {
    pub coordinator: Arc<UploadCoordinator>,
    pub max_chunk_size_bytes: usize,
}

/// Object storage gateway. `local` is set when the filesystem backend is active and
/// the API must serve its presigned URLs itself.
#[derive(Clone)]
pub struct ObjectState {
    pub storage: Arc<dyn Storage>,
    pub local: Option<Arc<LocalStorage>>,
}

/// Database pool, absent when the ledgers are in memory.
#[derive(Clone)]
pub struct DbState {
    pub pool: Option<PgPool>,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub upload: UploadState,
    pub objects: ObjectState,
    pub db: DbState,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for UploadState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.upload.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ObjectState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.objects.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
