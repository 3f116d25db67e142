//! Test helpers: build AppState and router for integration tests.
//!
//! The router is the production one from `setup::routes`; the ledgers are in memory and
//! the object store is a local directory, so no external services are needed.
#![allow(dead_code)]

use axum_test::{TestRequest, TestServer};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use storely_api::auth::JwtClaims;
use storely_api::constants;
use storely_api::setup::{routes, storage};
use storely_api::state::{AppState, DbState, UploadState};
use storely_core::{BaseConfig, Config, ObjectStoreKind, StorageBackend, StorageServiceConfig};
use storely_db::{InMemoryChunkLedger, InMemoryFileRecordStore, InMemoryQuotaLedger};
use storely_services::{UploadCoordinator, UploadSettings};
use tempfile::TempDir;
use uuid::Uuid;

/// JWT secret the test router verifies against.
pub const TEST_JWT_SECRET: &str = "integration-test-jwt-secret-at-least-32-chars";

/// Origin the local backend embeds in presigned URLs.
pub const TEST_ORIGIN: &str = "http://localhost:3000";

/// API path prefix for tests (e.g. `/api/v0/files`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the handles tests inspect directly.
pub struct TestApp {
    pub server: TestServer,
    pub quota: Arc<InMemoryQuotaLedger>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(storage_path: &str, default_limit: i64) -> Config {
    Config(Box::new(StorageServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            request_timeout_secs: 30,
        },
        database_url: "postgresql://unused/unused".to_string(),
        object_store: ObjectStoreKind::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(storage_path.to_string()),
        local_storage_base_url: Some(format!("{}{}", TEST_ORIGIN, constants::OBJECTS_PREFIX)),
        presign_secret: Some("integration-test-presign-secret".to_string()),
        default_storage_limit_bytes: default_limit,
        default_chunk_backend: StorageBackend::Object,
        max_chunk_size_bytes: 1024 * 1024,
    }))
}

/// Setup a test app whose owners start with `default_limit` bytes of quota.
pub async fn setup_test_app(default_limit: i64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().to_string();
    let config = test_config(&storage_path, default_limit);

    let objects = storage::setup_storage(&config)
        .await
        .expect("Failed to create local storage");

    let quota = Arc::new(InMemoryQuotaLedger::new());
    let coordinator = UploadCoordinator::new(
        Arc::new(InMemoryFileRecordStore::new()),
        Arc::new(InMemoryChunkLedger::new()),
        quota.clone(),
        objects.storage.clone(),
        UploadSettings::from_config(&config),
    );

    let state = Arc::new(AppState {
        upload: UploadState {
            coordinator: Arc::new(coordinator),
            max_chunk_size_bytes: config.max_chunk_size_bytes(),
        },
        objects,
        db: DbState { pool: None },
    });

    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        quota,
        _temp_dir: temp_dir,
    }
}

/// HS256 bearer token for `owner_id`, valid for an hour.
pub fn token_for(owner_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = JwtClaims {
        sub: owner_id,
        exp: now + 3600,
        iat: now,
        nbf: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// Turn an absolute presigned URL into a request against the test server.
pub fn presigned_request(server: &TestServer, method: &str, url: &str) -> TestRequest {
    let relative = url
        .strip_prefix(TEST_ORIGIN)
        .expect("presigned URL should use the test origin");
    let (path, query) = relative.split_once('?').unwrap_or((relative, ""));

    let mut request = match method {
        "PUT" => server.put(path),
        _ => server.get(path),
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        request = request.add_query_param(key, value);
    }
    request
}
