use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use storely_core::models::StorageHealth;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct StorageHealthQuery {
    /// Owner to report on; defaults to the caller
    pub owner_id: Option<Uuid>,
}

/// Quota usage for an owner
#[utoipa::path(
    get,
    path = "/api/v0/storage/health",
    tag = "storage",
    params(StorageHealthQuery),
    responses(
        (status = 200, description = "Quota snapshot", body = StorageHealth),
        (status = 403, description = "Owner differs from caller", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn storage_health(
    owner: OwnerContext,
    State(upload): State<UploadState>,
    Query(query): Query<StorageHealthQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let target = query.owner_id.unwrap_or(owner.owner_id);
    let health = upload
        .coordinator
        .storage_health(target, owner.owner_id)
        .await?;
    Ok(Json(health))
}
