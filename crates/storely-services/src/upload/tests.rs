use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use storely_core::models::FileStatus;
use storely_core::{AppError, StorageBackend};
use storely_db::{
    ChunkLedger, FileRecordStore, InMemoryChunkLedger, InMemoryFileRecordStore,
    InMemoryQuotaLedger, QuotaLedger,
};
use storely_storage::{
    chunk_key, ByteStream, LocalStorage, ObjectStoreKind, Storage, StorageError, StorageResult,
};
use tempfile::TempDir;
use uuid::Uuid;

use super::{IngestChunk, InitSession, UploadCoordinator, UploadSettings};

/// Local storage with switchable failures.
struct FlakyStorage {
    inner: LocalStorage,
    fail_presign: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        self.inner
            .upload_with_key(storage_key, data, content_type)
            .await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(storage_key).await
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        self.inner.download_stream(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("backend unavailable".to_string()));
        }
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.inner.get_presigned_url(storage_key, expires_in).await
    }

    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("signer unavailable".to_string()));
        }
        self.inner
            .presigned_put_url(storage_key, content_type, expires_in)
            .await
    }

    fn backend_type(&self) -> ObjectStoreKind {
        ObjectStoreKind::Local
    }

    fn bucket(&self) -> Option<&str> {
        Some("test-bucket")
    }
}

struct Harness {
    coordinator: Arc<UploadCoordinator>,
    files: Arc<InMemoryFileRecordStore>,
    chunks: Arc<InMemoryChunkLedger>,
    quota: Arc<InMemoryQuotaLedger>,
    storage: Arc<FlakyStorage>,
    _dir: TempDir,
}

async fn harness(default_limit: i64) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let inner = LocalStorage::new(
        dir.path(),
        "http://localhost:3000/objects".to_string(),
        "test-presign-secret",
    )
    .await
    .unwrap();

    let files = Arc::new(InMemoryFileRecordStore::new());
    let chunks = Arc::new(InMemoryChunkLedger::new());
    let quota = Arc::new(InMemoryQuotaLedger::new());
    let storage = Arc::new(FlakyStorage {
        inner,
        fail_presign: AtomicBool::new(false),
        fail_delete: AtomicBool::new(false),
    });

    let coordinator = Arc::new(UploadCoordinator::new(
        files.clone(),
        chunks.clone(),
        quota.clone(),
        storage.clone(),
        UploadSettings {
            default_storage_limit_bytes: default_limit,
            default_backend: StorageBackend::Object,
            url_ttl: Duration::from_secs(3600),
        },
    ));

    Harness {
        coordinator,
        files,
        chunks,
        quota,
        storage,
        _dir: dir,
    }
}

fn session(owner_id: Uuid, declared_size: i64, total_chunks: u32) -> InitSession {
    InitSession {
        owner_id,
        file_name: "holiday.mov".to_string(),
        file_type: "video/quicktime".to_string(),
        declared_size,
        total_chunks,
        backend: None,
    }
}

fn chunk(file_id: Option<Uuid>, owner_id: Uuid, index: u32, total: u32, data: &str) -> IngestChunk {
    IngestChunk {
        file_id,
        owner_id,
        chunk_index: index,
        total_chunks: total,
        data: Bytes::from(data.to_string()),
        content_type: "text/plain".to_string(),
        file_name: "notes.txt".to_string(),
    }
}

async fn used(h: &Harness, owner_id: Uuid) -> i64 {
    h.quota.get(owner_id).await.unwrap().unwrap().storage_used
}

async fn read_all(h: &Harness, file_id: Uuid) -> Vec<u8> {
    let download = h.coordinator.download(file_id).await.unwrap();
    let parts: Vec<Bytes> = download.stream.try_collect().await.unwrap();
    parts.concat()
}

#[tokio::test]
async fn test_document_upload_out_of_order_completes_and_downloads_in_order() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();

    let mut request = session(owner, 300, 3);
    request.backend = Some(StorageBackend::Document);
    let opened = h.coordinator.init_session(request).await.unwrap();
    assert!(opened.credentials.is_empty());
    assert_eq!(opened.record.storage_backend, StorageBackend::Document);
    assert_eq!(used(&h, owner).await, 300);

    let file_id = Some(opened.record.id);
    let mut received = Vec::new();
    for (index, data) in [(2, "chunk2"), (0, "chunk0"), (1, "chunk1")] {
        let response = h
            .coordinator
            .ingest_chunk(chunk(file_id, owner, index, 3, data))
            .await
            .unwrap();
        received.push(response.chunks_received);
    }
    assert_eq!(received, vec![1, 2, 3]);

    let record = h.coordinator.get_file(opened.record.id).await.unwrap();
    assert_eq!(record.status(), FileStatus::Complete);

    let finalized = h.coordinator.finalize(opened.record.id).await.unwrap();
    assert_eq!(finalized.status, "success");

    assert_eq!(read_all(&h, opened.record.id).await, b"chunk0chunk1chunk2");
}

#[tokio::test]
async fn test_object_upload_via_presigned_urls_then_finalize() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();

    let opened = h.coordinator.init_session(session(owner, 300, 3)).await.unwrap();
    let file_id = opened.record.id;
    assert_eq!(opened.record.storage_backend, StorageBackend::Object);
    assert_eq!(opened.record.bucket_name.as_deref(), Some("test-bucket"));
    assert_eq!(opened.credentials.len(), 3);
    for (i, credential) in opened.credentials.iter().enumerate() {
        assert_eq!(credential.chunk_index, i as u32);
        assert_eq!(credential.object_key, chunk_key(file_id, i as u32));
        assert!(credential.url.contains("method=PUT"));
    }

    // The client PUTs straight to the object store.
    for (index, data) in [(1u32, "bbb"), (0, "aaa"), (2, "ccc")] {
        h.storage
            .upload_with_key(&chunk_key(file_id, index), Bytes::from(data), "text/plain")
            .await
            .unwrap();
    }

    let progress = h.coordinator.progress(file_id).await.unwrap();
    assert_eq!(progress.chunks_received, 3);
    assert!(!progress.complete);

    h.coordinator.finalize(file_id).await.unwrap();
    assert!(h.coordinator.progress(file_id).await.unwrap().complete);
    assert_eq!(read_all(&h, file_id).await, b"aaabbbccc");

    let links = h.coordinator.download_links(file_id).await.unwrap();
    assert_eq!(links.total_chunks, 3);
    assert_eq!(links.declared_size, 300);
    assert_eq!(links.chunks.len(), 3);
    assert!(links.chunks[2].url.contains(&format!("{}/chunk_2", file_id)));
    assert!(links.chunks[2].url.contains("method=GET"));
}

#[tokio::test]
async fn test_object_sink_ingest_writes_object_and_ledger_row() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 6, 2)).await.unwrap();
    let file_id = opened.record.id;

    h.coordinator
        .ingest_chunk(chunk(Some(file_id), owner, 0, 2, "abc"))
        .await
        .unwrap();

    assert!(h.storage.exists(&chunk_key(file_id, 0)).await.unwrap());
    let rows = h.chunks.get_chunks(file_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].payload.is_none());
    assert_eq!(rows[0].size, 3);

    let response = h
        .coordinator
        .ingest_chunk(chunk(Some(file_id), owner, 1, 2, "def"))
        .await
        .unwrap();
    assert_eq!(response.chunks_received, 2);
    assert_eq!(read_all(&h, file_id).await, b"abcdef");
}

#[tokio::test]
async fn test_quota_exceeded_creates_nothing() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    h.quota.set_account(owner, 200, 1000).await;

    let err = h
        .coordinator
        .init_session(session(owner, 900, 3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::QuotaExceeded {
            used: 200,
            requested: 900,
            limit: 1000
        }
    ));
    assert_eq!(used(&h, owner).await, 200);
    assert!(h.coordinator.list_files(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_declared_size_is_quota_exceeded() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    h.quota.set_account(owner, 1, 1000).await;

    let err = h
        .coordinator
        .init_session(session(owner, i64::MAX, 1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::QuotaExceeded {
            used: 1,
            requested: i64::MAX,
            limit: 1000
        }
    ));
    assert_eq!(used(&h, owner).await, 1);
    assert!(h.coordinator.list_files(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finalize_with_gap_reports_missing_chunks() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 300, 3)).await.unwrap();
    let file_id = opened.record.id;

    for index in [0u32, 2] {
        h.storage
            .upload_with_key(&chunk_key(file_id, index), Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap();
    }

    let err = h.coordinator.finalize(file_id).await.unwrap_err();
    match err {
        AppError::MissingChunks { missing, total } => {
            assert_eq!(missing, vec![1]);
            assert_eq!(total, 3);
        }
        other => panic!("expected MissingChunks, got {:?}", other),
    }

    assert!(!h.files.get(file_id).await.unwrap().unwrap().complete);
    assert_eq!(h.coordinator.progress(file_id).await.unwrap().chunks_received, 2);
}

#[tokio::test]
async fn test_finalize_document_backend_uses_ledger() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let mut request = session(owner, 10, 2);
    request.backend = Some(StorageBackend::Document);
    let opened = h.coordinator.init_session(request).await.unwrap();

    h.coordinator
        .ingest_chunk(chunk(Some(opened.record.id), owner, 1, 2, "tail"))
        .await
        .unwrap();

    assert!(matches!(
        h.coordinator.finalize(opened.record.id).await,
        Err(AppError::MissingChunks { ref missing, total: 2 }) if *missing == vec![0u32]
    ));
}

#[tokio::test]
async fn test_delete_releases_quota_and_second_delete_is_not_found() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 300, 2)).await.unwrap();
    let file_id = opened.record.id;
    for index in 0..2 {
        h.coordinator
            .ingest_chunk(chunk(Some(file_id), owner, index, 2, "data"))
            .await
            .unwrap();
    }
    assert_eq!(used(&h, owner).await, 300);

    let deleted = h.coordinator.delete_file(file_id, owner).await.unwrap();
    assert_eq!(deleted.status, "deleted");
    assert_eq!(used(&h, owner).await, 0);
    assert!(!h.storage.exists(&chunk_key(file_id, 0)).await.unwrap());
    assert_eq!(h.chunks.count_chunks(file_id).await.unwrap(), 0);

    assert!(matches!(
        h.coordinator.delete_file(file_id, owner).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_of_partial_upload_tolerates_missing_objects() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 100, 4)).await.unwrap();
    h.coordinator
        .ingest_chunk(chunk(Some(opened.record.id), owner, 3, 4, "last"))
        .await
        .unwrap();

    h.coordinator
        .delete_file(opened.record.id, owner)
        .await
        .unwrap();
    assert!(h.files.get(opened.record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_by_other_owner_is_forbidden() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 300, 1)).await.unwrap();

    let err = h
        .coordinator
        .delete_file(opened.record.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(h.files.get(opened.record.id).await.unwrap().is_some());
    assert_eq!(used(&h, owner).await, 300);
}

#[tokio::test]
async fn test_ingest_by_other_owner_is_forbidden() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let mut request = session(owner, 30, 3);
    request.backend = Some(StorageBackend::Document);
    let opened = h.coordinator.init_session(request).await.unwrap();

    let err = h
        .coordinator
        .ingest_chunk(chunk(Some(opened.record.id), Uuid::new_v4(), 0, 3, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(h.chunks.count_chunks(opened.record.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_aborts_on_backend_failure() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 300, 2)).await.unwrap();
    h.storage.fail_delete.store(true, Ordering::SeqCst);

    let err = h
        .coordinator
        .delete_file(opened.record.id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert!(h.files.get(opened.record.id).await.unwrap().is_some());
    assert_eq!(used(&h, owner).await, 300);
}

#[tokio::test]
async fn test_presign_failure_leaves_session_pending_and_quota_reserved() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    h.storage.fail_presign.store(true, Ordering::SeqCst);

    let err = h
        .coordinator
        .init_session(session(owner, 400, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    let files = h.coordinator.list_files(owner).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].status(), FileStatus::Pending);
    assert_eq!(used(&h, owner).await, 400);
}

#[tokio::test]
async fn test_ingest_without_file_id_opens_document_session() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();

    let response = h
        .coordinator
        .ingest_chunk(chunk(None, owner, 0, 4, "0123456789"))
        .await
        .unwrap();

    assert_eq!(response.chunks_received, 1);
    assert_eq!(response.total_chunks, 4);
    assert_eq!(response.file_name, "notes.txt");
    assert_eq!(response.file_type, "text/plain");

    let record = h.coordinator.get_file(response.file_id).await.unwrap();
    assert_eq!(record.storage_backend, StorageBackend::Document);
    assert_eq!(record.declared_size, 40);
    assert_eq!(used(&h, owner).await, 40);
}

#[tokio::test]
async fn test_ingest_validation() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 30, 3)).await.unwrap();
    let file_id = Some(opened.record.id);

    assert!(matches!(
        h.coordinator.ingest_chunk(chunk(file_id, owner, 3, 3, "x")).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        h.coordinator.ingest_chunk(chunk(file_id, owner, 0, 4, "x")).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        h.coordinator.ingest_chunk(chunk(file_id, owner, 0, 3, "")).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        h.coordinator
            .ingest_chunk(chunk(Some(Uuid::new_v4()), owner, 0, 3, "x"))
            .await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(h.chunks.count_chunks(opened.record.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_redelivered_chunk_is_counted_once() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let mut request = session(owner, 30, 3);
    request.backend = Some(StorageBackend::Document);
    let opened = h.coordinator.init_session(request).await.unwrap();
    let file_id = Some(opened.record.id);

    for data in ["first", "second", "third"] {
        let response = h
            .coordinator
            .ingest_chunk(chunk(file_id, owner, 1, 3, data))
            .await
            .unwrap();
        assert_eq!(response.chunks_received, 1);
    }

    let rows = h.chunks.get_chunks(opened.record.id).await.unwrap();
    assert_eq!(rows[0].payload.as_deref(), Some(&b"third"[..]));
}

#[tokio::test]
async fn test_init_session_validation_reserves_nothing() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();

    let mut empty_name = session(owner, 10, 1);
    empty_name.file_name = "   ".to_string();
    let mut long_name = session(owner, 10, 1);
    long_name.file_name = "a".repeat(256);

    for request in [
        session(owner, 10, 0),
        session(owner, 10, 10_001),
        session(owner, -1, 1),
        empty_name,
        long_name,
    ] {
        assert!(matches!(
            h.coordinator.init_session(request).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    assert!(h.quota.get(owner).await.unwrap().is_none());
    assert!(h.coordinator.list_files(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_requires_complete_file() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let opened = h.coordinator.init_session(session(owner, 10, 2)).await.unwrap();

    assert!(matches!(
        h.coordinator.download(opened.record.id).await,
        Err(AppError::NotComplete(_))
    ));
    assert!(matches!(
        h.coordinator.download_links(opened.record.id).await,
        Err(AppError::NotComplete(_))
    ));
}

#[tokio::test]
async fn test_download_links_rejected_for_document_backend() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    let response = h
        .coordinator
        .ingest_chunk(chunk(None, owner, 0, 1, "only"))
        .await
        .unwrap();

    assert!(matches!(
        h.coordinator.download_links(response.file_id).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(read_all(&h, response.file_id).await, b"only");
}

#[tokio::test]
async fn test_storage_health_is_owner_only() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();
    h.coordinator.init_session(session(owner, 250, 1)).await.unwrap();

    let health = h.coordinator.storage_health(owner, owner).await.unwrap();
    assert_eq!(health.storage_used, 250);
    assert_eq!(health.storage_limit, 1000);
    assert_eq!(health.available_balance, 750);

    assert!(matches!(
        h.coordinator.storage_health(owner, Uuid::new_v4()).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_concurrent_sessions_admit_only_what_fits() {
    let h = harness(1000).await;
    let owner = Uuid::new_v4();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let coordinator = h.coordinator.clone();
            tokio::spawn(async move { coordinator.init_session(session(owner, 300, 1)).await })
        })
        .collect();

    let mut admitted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(AppError::QuotaExceeded { .. }) => refused += 1,
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(refused, 3);
    assert_eq!(used(&h, owner).await, 900);
    assert_eq!(h.coordinator.list_files(owner).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_concurrent_chunk_ingestion_completes_once() {
    let h = harness(1_000_000).await;
    let owner = Uuid::new_v4();
    let total = 16u32;
    let mut request = session(owner, 1000, total);
    request.backend = Some(StorageBackend::Document);
    let opened = h.coordinator.init_session(request).await.unwrap();
    let file_id = opened.record.id;

    let handles: Vec<_> = (0..total)
        .rev()
        .map(|index| {
            let coordinator = h.coordinator.clone();
            let data = format!("{:02}", index);
            tokio::spawn(async move {
                coordinator
                    .ingest_chunk(chunk(Some(file_id), owner, index, total, &data))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let progress = h.coordinator.progress(file_id).await.unwrap();
    assert!(progress.complete);
    assert_eq!(progress.chunks_received, total);

    let expected: String = (0..total).map(|i| format!("{:02}", i)).collect();
    assert_eq!(read_all(&h, file_id).await, expected.as_bytes());
}
