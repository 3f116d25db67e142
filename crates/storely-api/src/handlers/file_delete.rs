use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use storely_core::models::DeleteFileResponse;
use uuid::Uuid;

/// Delete a file and release its reserved quota
///
/// Only the owner may delete. Chunks are removed before the record; a backend failure
/// leaves the record in place so the call can be retried.
#[utoipa::path(
    delete,
    path = "/api/v0/files/{file_id}",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 403, description = "Caller does not own the file", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 503, description = "Object storage unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = upload
        .coordinator
        .delete_file(file_id, owner.owner_id)
        .await?;
    Ok(Json(response))
}
