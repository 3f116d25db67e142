use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // owner_id
    pub exp: i64,  // expiration timestamp
    pub iat: i64,  // issued at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>, // not-before timestamp (optional)
}

/// Authenticated owner stored in request extensions by the auth middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerContext {
    pub owner_id: Uuid,
}

// Extracted from request parts so it composes with Multipart bodies
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<OwnerContext>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Missing owner context".to_string(),
                    code: "MISSING_OWNER_CONTEXT".to_string(),
                    recoverable: false,
                    details: None,
                    error_type: None,
                    suggested_action: Some("Check the bearer token".to_string()),
                }),
            )
        })
    }
}
