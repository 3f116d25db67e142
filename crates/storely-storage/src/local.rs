//! Local filesystem storage.
//!
//! Presigned URLs have the form
//! `{base_url}/{key}?method={METHOD}&expires={unix_ts}&signature={hex}` where the
//! signature is HMAC-SHA256 over `METHOD\nkey\nexpires` with the secret passed at
//! construction. The HTTP layer serves these URLs and checks them with
//! [`LocalStorage::verify_signature`].

use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::ObjectStoreKind;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signing_key: Vec<u8>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/storely/objects")
    /// * `base_url` - Base URL the objects route is mounted at (e.g., "http://localhost:3000/objects")
    /// * `signing_secret` - Secret used to sign and verify presigned URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: impl AsRef<[u8]>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        let signing_key = signing_secret.as_ref().to_vec();

        if signing_key.is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage signing secret must not be empty".to_string(),
            ));
        }

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            signing_key,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key doesn't contain path traversal
    /// sequences that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for an object
    fn generate_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url.trim_end_matches('/'), encoded.join("/"))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn mac(&self, method: &str, storage_key: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        mac.update(method.to_ascii_uppercase().as_bytes());
        mac.update(b"\n");
        mac.update(storage_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    /// Build a presigned URL for `method` on `storage_key`, valid for `expires_in`.
    pub fn presign(
        &self,
        method: &str,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        let method = method.to_ascii_uppercase();
        let signature = hex::encode(
            self.mac(&method, storage_key, expires)?
                .finalize()
                .into_bytes(),
        );

        Ok(format!(
            "{}?method={}&expires={}&signature={}",
            self.generate_url(storage_key),
            method,
            expires,
            signature
        ))
    }

    /// Check a presigned URL's parameters for `method` on `storage_key`.
    pub fn verify_signature(
        &self,
        method: &str,
        storage_key: &str,
        expires: i64,
        signature: &str,
    ) -> StorageResult<()> {
        validate_key(storage_key)?;

        if Utc::now().timestamp() > expires {
            return Err(StorageError::InvalidSignature(
                "Presigned URL has expired".to_string(),
            ));
        }

        let provided = hex::decode(signature).map_err(|_| {
            StorageError::InvalidSignature("Malformed presigned URL signature".to_string())
        })?;

        self.mac(method, storage_key, expires)?
            .verify_slice(&provided)
            .map_err(|_| {
                StorageError::InvalidSignature("Presigned URL signature mismatch".to_string())
            })
    }
}

/// Only a missing file counts as absent; any other stat failure is a backend error.
async fn object_exists(path: &Path) -> StorageResult<bool> {
    fs::try_exists(path).await.map_err(|e| {
        StorageError::BackendError(format!("Failed to stat {}: {}", path.display(), e))
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut file = fs::File::create(path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;

    file.write_all(data).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
    })?;

    file.sync_all().await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Readers only ever see a complete object: write a sibling, then rename over the key.
        let staging = staging_path(&path);
        if let Err(e) = write_file(&staging, &data).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        fs::rename(&staging, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to move {} into place: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(self.generate_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;

        if !object_exists(&path).await? {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        if !object_exists(&path).await? {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = storage_key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(error = %e, key = %key, "Local storage stream download error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !object_exists(&path).await? {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %storage_key, "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        object_exists(&path).await
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.presign("GET", storage_key, expires_in)
    }

    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.presign("PUT", storage_key, expires_in)
    }

    fn backend_type(&self) -> ObjectStoreKind {
        ObjectStoreKind::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::tempdir;

    const SECRET: &str = "local-presign-secret";

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:3000/objects".to_string(), SECRET)
            .await
            .unwrap()
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').unwrap().1;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .upload_with_key("file/chunk_0", Bytes::from_static(b"test data"), "text/plain")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/objects/file/chunk_0");

        assert!(storage.exists("file/chunk_0").await.unwrap());
        assert_eq!(storage.download("file/chunk_0").await.unwrap(), b"test data");

        let streamed: Vec<Bytes> = storage
            .download_stream("file/chunk_0")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(streamed.concat(), b"test data");
    }

    #[tokio::test]
    async fn test_upload_replaces_existing_object() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .upload_with_key("f/chunk_0", Bytes::from_static(b"first"), "text/plain")
            .await
            .unwrap();
        storage
            .upload_with_key("f/chunk_0", Bytes::from_static(b"second"), "text/plain")
            .await
            .unwrap();

        assert_eq!(storage.download("f/chunk_0").await.unwrap(), b"second");

        let mut entries = fs::read_dir(dir.path().join("f")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["chunk_0".to_string()]);
    }

    #[tokio::test]
    async fn test_readers_never_see_partial_overwrite() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let size = 512 * 1024;
        let payloads = [vec![b'a'; size], vec![b'b'; size]];

        storage
            .upload_with_key("f/chunk_0", Bytes::from(payloads[0].clone()), "text/plain")
            .await
            .unwrap();

        let writer = {
            let storage = storage.clone();
            let payloads = payloads.clone();
            tokio::spawn(async move {
                for round in 0..20 {
                    storage
                        .upload_with_key(
                            "f/chunk_0",
                            Bytes::from(payloads[round % 2].clone()),
                            "text/plain",
                        )
                        .await
                        .unwrap();
                }
            })
        };

        for _ in 0..20 {
            let body = storage.download("f/chunk_0").await.unwrap();
            assert_eq!(body.len(), size);
            assert!(body == payloads[0] || body == payloads[1]);
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_exists_reports_stat_failure() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        storage
            .upload_with_key("f/chunk_0", Bytes::from_static(b"data"), "text/plain")
            .await
            .unwrap();

        // A regular file used as a directory fails with ENOTDIR, not NotFound.
        assert!(matches!(
            storage.exists("f/chunk_0/nested").await,
            Err(StorageError::BackendError(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(storage.delete("nothing/chunk_0").await.is_ok());
        assert!(!storage.exists("nothing/chunk_0").await.unwrap());
        assert!(matches!(
            storage.download("nothing/chunk_0").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_presigned_url_round_trips_through_verify() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .presigned_put_url("f/chunk_3", "application/octet-stream", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:3000/objects/f/chunk_3?method=PUT&expires="));
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");

        assert!(storage
            .verify_signature("PUT", "f/chunk_3", expires, signature)
            .is_ok());

        // A PUT credential does not authorize reads or other keys.
        assert!(matches!(
            storage.verify_signature("GET", "f/chunk_3", expires, signature),
            Err(StorageError::InvalidSignature(_))
        ));
        assert!(matches!(
            storage.verify_signature("PUT", "f/chunk_4", expires, signature),
            Err(StorageError::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_signature_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let expires = Utc::now().timestamp() - 10;
        let signature = hex::encode(
            storage
                .mac("GET", "f/chunk_0", expires)
                .unwrap()
                .finalize()
                .into_bytes(),
        );

        assert!(matches!(
            storage.verify_signature("GET", "f/chunk_0", expires, &signature),
            Err(StorageError::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_from_other_secret_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let other = LocalStorage::new(dir.path(), "http://localhost:3000/objects".to_string(), "x")
            .await
            .unwrap();

        let url = other
            .get_presigned_url("f/chunk_0", Duration::from_secs(60))
            .await
            .unwrap();
        let expires: i64 = query_param(&url, "expires").parse().unwrap();

        assert!(storage
            .verify_signature("GET", "f/chunk_0", expires, query_param(&url, "signature"))
            .is_err());
    }
}
