use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Where the chunk payloads of a file live.
///
/// `Document` keeps payloads in the chunk ledger (database rows); `Object` keeps them
/// in the object store under `{file_id}/chunk_{index}`. Chosen once per upload session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "storage_backend", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Document,
    Object,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" => Ok(StorageBackend::Document),
            "object" => Ok(StorageBackend::Object),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Document => write!(f, "document"),
            StorageBackend::Object => write!(f, "object"),
        }
    }
}

/// Object store implementations available to the storage gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreKind {
    S3,
    Local,
}

impl FromStr for ObjectStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" | "minio" => Ok(ObjectStoreKind::S3),
            "local" => Ok(ObjectStoreKind::Local),
            _ => Err(anyhow::anyhow!("Invalid object store kind: {}", s)),
        }
    }
}

impl Display for ObjectStoreKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ObjectStoreKind::S3 => write!(f, "s3"),
            ObjectStoreKind::Local => write!(f, "local"),
        }
    }
}
