//! Upload session initialization

use crate::auth::OwnerContext;
use crate::constants::API_PREFIX;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::UploadState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use storely_core::models::{ChunkUploadUrl, InitUploadRequest, InitUploadResponse};
use storely_services::InitSession;
use validator::Validate;

/// Open a chunked upload session
///
/// Reserves `fileSize` bytes against the caller's quota. Object-backed sessions receive
/// one presigned PUT URL per chunk; document-backed sessions upload through
/// `POST /files/chunks`.
#[utoipa::path(
    post,
    path = "/api/v0/files/init",
    tag = "files",
    request_body = InitUploadRequest,
    responses(
        (status = 201, description = "Upload session opened", body = InitUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 413, description = "Storage quota exceeded", body = ErrorResponse),
        (status = 503, description = "Object storage unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn init_upload(
    owner: OwnerContext,
    State(upload): State<UploadState>,
    ValidatedJson(request): ValidatedJson<InitUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let session = upload
        .coordinator
        .init_session(InitSession {
            owner_id: owner.owner_id,
            file_name: request.file_name,
            file_type: request.file_type,
            declared_size: request.file_size,
            total_chunks: request.total_chunks,
            backend: request.storage_backend,
        })
        .await?;

    let file_id = session.record.id;
    let upload_urls = session
        .credentials
        .into_iter()
        .map(|credential| ChunkUploadUrl {
            chunk_index: credential.chunk_index,
            upload_url: credential.url,
            object_key: credential.object_key,
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(InitUploadResponse {
            file_id,
            storage_backend: session.record.storage_backend,
            upload_urls,
            callback_url: format!("{}/files/{}/complete", API_PREFIX, file_id),
            expires_at: session.expires_at,
        }),
    ))
}
