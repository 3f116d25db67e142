//! Proxied download and direct download links

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use storely_core::models::DownloadLinksResponse;
use storely_core::AppError;
use uuid::Uuid;

/// `attachment` disposition with an ASCII fallback name and the UTF-8 original.
fn content_disposition(file_name: &str) -> Result<HeaderValue, AppError> {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    ))
    .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition header: {}", e)))
}

/// Stream a complete file in chunk order
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}/download",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "File still uploading", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_file(
    _owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let download = upload.coordinator.download(file_id).await?;

    let content_type = HeaderValue::from_str(&download.record.file_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = content_disposition(&download.record.file_name)?;

    tracing::debug!(
        file_id = %file_id,
        total_chunks = download.record.total_chunks,
        backend = %download.record.storage_backend,
        "Streaming file download"
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}

/// Presigned GET URLs for each chunk of an object-backed file
#[utoipa::path(
    get,
    path = "/api/v0/files/{file_id}/links",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Chunk download links in index order", body = DownloadLinksResponse),
        (status = 400, description = "File is document-backed", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "File still uploading or chunks missing", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_links(
    _owner: OwnerContext,
    State(upload): State<UploadState>,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let links = upload.coordinator.download_links(file_id).await?;
    Ok(Json(links))
}
