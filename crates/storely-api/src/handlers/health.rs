//! Liveness and API document endpoints

use crate::api_doc::ApiDoc;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::{OpenApi, ToSchema};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

async fn run_check<E>(
    check: impl Future<Output = Result<(), E>>,
    failed: &'static str,
) -> &'static str
where
    E: std::fmt::Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(())) => "healthy",
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Health check failed");
            failed
        }
        Err(_) => {
            tracing::warn!("Health check timed out");
            failed
        }
    }
}

/// Liveness and dependency check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Database unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.pool.clone() {
        Some(pool) => {
            run_check(
                async move { sqlx::query("SELECT 1").execute(&pool).await.map(drop) },
                "unhealthy",
            )
            .await
        }
        None => "in_memory",
    };

    let storage = state.objects.storage.clone();
    let storage = run_check(
        async move { storage.exists("health-check/probe").await.map(drop) },
        "degraded",
    )
    .await;

    let healthy = database != "unhealthy";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database: database.to_string(),
            storage: storage.to_string(),
        }),
    )
}

pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
