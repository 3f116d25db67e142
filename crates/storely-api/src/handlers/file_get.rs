use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use storely_core::models::FileResponse;
use uuid::Uuid;

/// Get file metadata
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    _owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = upload.coordinator.get_file(file_id).await?;
    Ok(Json(FileResponse::from(record)))
}

/// List the caller's files, newest first
#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "Files owned by the caller", body = Vec<FileResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    owner: OwnerContext,
    State(upload): State<UploadState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let files: Vec<FileResponse> = upload
        .coordinator
        .list_files(owner.owner_id)
        .await?
        .into_iter()
        .map(FileResponse::from)
        .collect();
    Ok(Json(files))
}
