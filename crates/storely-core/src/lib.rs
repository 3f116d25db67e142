//! Storely Core Library
//!
//! This crate provides core domain models, error types, configuration, and constants
//! that are shared across all Storely components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, StorageServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{ObjectStoreKind, StorageBackend};
// Note: Storage, StorageError, StorageResult live in the storely-storage crate
