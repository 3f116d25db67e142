//! Shared constants for upload sessions and quotas.

use std::time::Duration;

/// Lifetime of every presigned chunk credential (PUT and GET).
pub const CHUNK_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on chunks per file; larger files must use bigger chunks.
pub const MAX_TOTAL_CHUNKS: u32 = 10_000;

/// Maximum file name length accepted at session init.
pub const MAX_FILE_NAME_LEN: u64 = 255;

/// Storage limit given to an owner the first time they are seen (5 GiB).
pub const DEFAULT_STORAGE_LIMIT_BYTES: i64 = 5 * 1024 * 1024 * 1024;

/// Content type recorded when a client does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
