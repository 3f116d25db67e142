//! Route configuration and setup

use crate::auth::{auth_middleware, AuthState};
use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES, OBJECTS_PREFIX, OPENAPI_PATH};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use storely_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(config.jwt_secret()));

    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let body_limit = state
        .upload
        .max_chunk_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    // Server-level concurrency limit to protect against resource exhaustion under load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);

    tracing::info!(
        body_limit_bytes = body_limit,
        http_concurrency_limit = http_concurrency_limit,
        request_timeout_secs = config.request_timeout().as_secs(),
        "Request limits configured"
    );

    let app = public_routes()
        .nest(API_PREFIX, protected)
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Routes reachable without a bearer token
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(OPENAPI_PATH, get(handlers::health::openapi_spec))
        .route(
            &format!("{}/{{*key}}", OBJECTS_PREFIX),
            put(handlers::objects::put_object).get(handlers::objects::get_object),
        )
}

/// Upload, retrieval and quota routes; nested under the API prefix behind the JWT layer
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files", get(handlers::file_get::list_files))
        .route("/files/init", post(handlers::upload_init::init_upload))
        .route("/files/chunks", post(handlers::chunk_upload::upload_chunk))
        .route(
            "/files/{file_id}",
            get(handlers::file_get::get_file).delete(handlers::file_delete::delete_file),
        )
        .route(
            "/files/{file_id}/complete",
            post(handlers::file_complete::complete_upload),
        )
        .route(
            "/files/{file_id}/progress",
            get(handlers::file_complete::upload_progress),
        )
        .route(
            "/files/{file_id}/download",
            get(handlers::file_download::download_file),
        )
        .route(
            "/files/{file_id}/links",
            get(handlers::file_download::download_links),
        )
        .route(
            "/storage/health",
            get(handlers::storage_health::storage_health),
        )
}
