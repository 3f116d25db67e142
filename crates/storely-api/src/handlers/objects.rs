//! Presigned object routes for the local filesystem backend
//!
//! Clients PUT chunks to (and GET chunks from) the URLs issued at init and by the links
//! endpoint. The HMAC signature in the query string is the only credential.

use crate::error::HttpAppError;
use crate::state::ObjectState;
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use storely_core::constants::DEFAULT_CONTENT_TYPE;
use storely_core::AppError;
use storely_services::{LocalStorage, Storage};

#[derive(Debug, Deserialize)]
pub struct SignedObjectQuery {
    pub method: Option<String>,
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

fn verify(
    objects: &ObjectState,
    method: &str,
    key: &str,
    query: &SignedObjectQuery,
) -> Result<Arc<LocalStorage>, AppError> {
    let local = objects.local.clone().ok_or_else(|| {
        AppError::NotFound("Signed object routes are served by the local backend only".to_string())
    })?;

    let (Some(signed_method), Some(expires), Some(signature)) =
        (&query.method, query.expires, &query.signature)
    else {
        return Err(AppError::Forbidden(
            "Missing presigned URL parameters".to_string(),
        ));
    };

    if !signed_method.eq_ignore_ascii_case(method) {
        return Err(AppError::Forbidden(format!(
            "Presigned URL was issued for {}, not {}",
            signed_method, method
        )));
    }

    local.verify_signature(method, key, expires, signature)?;
    Ok(local)
}

/// Store a chunk object through a presigned PUT URL
pub async fn put_object(
    State(objects): State<ObjectState>,
    Path(key): Path<String>,
    Query(query): Query<SignedObjectQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let local = verify(&objects, "PUT", &key, &query)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    let size = body.len();

    local.upload_with_key(&key, body, content_type).await?;

    tracing::debug!(key = %key, size_bytes = size, "Object stored via presigned URL");
    Ok(StatusCode::OK)
}

/// Read a chunk object through a presigned GET URL
pub async fn get_object(
    State(objects): State<ObjectState>,
    Path(key): Path<String>,
    Query(query): Query<SignedObjectQuery>,
) -> Result<Response, HttpAppError> {
    let local = verify(&objects, "GET", &key, &query)?;

    let stream = local.download_stream(&key).await?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        )],
        Body::from_stream(stream),
    )
        .into_response())
}
