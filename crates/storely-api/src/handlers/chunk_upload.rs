//! Proxied chunk upload
//!
//! Accepts one chunk as multipart form data. Without `fileId` the first chunk opens a
//! document-backed session sized `len(chunk) * totalChunks`.

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use storely_core::constants::DEFAULT_CONTENT_TYPE;
use storely_core::models::ChunkUploadResponse;
use storely_core::AppError;
use storely_services::IngestChunk;
use uuid::Uuid;

#[derive(Default)]
struct ChunkForm {
    file_id: Option<Uuid>,
    chunk_index: Option<u32>,
    total_chunks: Option<u32>,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Option<Bytes>,
}

fn parse_u32(value: &str, field: &str) -> Result<u32, AppError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| AppError::InvalidInput(format!("{} must be a non-negative integer", field)))
}

async fn read_form(mut multipart: Multipart) -> Result<ChunkForm, HttpAppError> {
    let mut form = ChunkForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "fileId" => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    form.file_id = Some(Uuid::parse_str(value).map_err(AppError::from)?);
                }
            }
            "chunkIndex" => form.chunk_index = Some(parse_u32(&field.text().await?, "chunkIndex")?),
            "totalChunks" => {
                form.total_chunks = Some(parse_u32(&field.text().await?, "totalChunks")?)
            }
            "fileName" => form.file_name = Some(field.text().await?),
            "file" => {
                if form.file_name.is_none() {
                    form.file_name = field.file_name().map(String::from);
                }
                form.content_type = field.content_type().map(String::from);
                form.data = Some(field.bytes().await?);
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Upload one chunk through the server
#[utoipa::path(
    post,
    path = "/api/v0/files/chunks",
    tag = "files",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Fields: fileId (optional), chunkIndex, totalChunks, fileName (optional), file"
    ),
    responses(
        (status = 200, description = "Chunk stored", body = ChunkUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Unknown fileId", body = ErrorResponse),
        (status = 413, description = "Chunk too large or quota exceeded", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_chunk(
    owner: OwnerContext,
    State(upload): State<UploadState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_form(multipart).await?;

    let data = form
        .data
        .ok_or_else(|| AppError::InvalidInput("Missing file field".to_string()))?;
    let chunk_index = form
        .chunk_index
        .ok_or_else(|| AppError::InvalidInput("Missing chunkIndex field".to_string()))?;
    let total_chunks = form
        .total_chunks
        .ok_or_else(|| AppError::InvalidInput("Missing totalChunks field".to_string()))?;

    if data.len() > upload.max_chunk_size_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Chunk of {} bytes exceeds the {} byte limit",
            data.len(),
            upload.max_chunk_size_bytes
        ))
        .into());
    }

    let response = upload
        .coordinator
        .ingest_chunk(IngestChunk {
            file_id: form.file_id,
            owner_id: owner.owner_id,
            chunk_index,
            total_chunks,
            data,
            content_type: form
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            file_name: form.file_name.unwrap_or_else(|| "upload".to_string()),
        })
        .await?;

    Ok(Json(response))
}
