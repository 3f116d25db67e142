//! Finalize and progress

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use storely_core::models::{FinalizeResponse, ProgressResponse};
use uuid::Uuid;

/// Mark an upload complete once every chunk is present
///
/// Idempotent: finalizing a complete file succeeds again without side effects.
#[utoipa::path(
    post,
    path = "/api/v0/files/{file_id}/complete",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "All chunks present, file complete", body = FinalizeResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "Chunks missing", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_upload(
    _owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = upload.coordinator.finalize(file_id).await?;
    Ok(Json(response))
}

/// Number of chunks received so far
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}/progress",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Upload progress", body = ProgressResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_progress(
    _owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = upload.coordinator.progress(file_id).await?;
    Ok(Json(response))
}
