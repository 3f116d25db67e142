//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use storely_core::models;
use storely_core::StorageBackend;

/// Registers the HS256 bearer scheme referenced by every `/api/v0` path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storely API",
        version = "0.1.0",
        description = "Chunked upload service (v0): upload sessions with per-owner storage quota, proxied or presigned chunk transfer, completion tracking and streamed downloads. All authenticated endpoints are under /api/v0/."
    ),
    paths(
        handlers::health::health_check,
        // Upload sessions
        handlers::upload_init::init_upload,
        handlers::chunk_upload::upload_chunk,
        handlers::file_complete::complete_upload,
        handlers::file_complete::upload_progress,
        // Files
        handlers::file_get::get_file,
        handlers::file_get::list_files,
        handlers::file_download::download_file,
        handlers::file_download::download_links,
        handlers::file_delete::delete_file,
        // Quota
        handlers::storage_health::storage_health,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthCheckResponse,
        StorageBackend,
        models::FileStatus,
        models::FileResponse,
        models::InitUploadRequest,
        models::InitUploadResponse,
        models::ChunkUploadUrl,
        models::ChunkUploadResponse,
        models::FinalizeResponse,
        models::ProgressResponse,
        models::ChunkDownloadUrl,
        models::DownloadLinksResponse,
        models::DeleteFileResponse,
        models::StorageHealth,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "Upload sessions, chunks and file retrieval"),
        (name = "storage", description = "Per-owner storage quota"),
        (name = "health", description = "Service liveness")
    )
)]
pub struct ApiDoc;
