//! API constants
//!
//! Every authenticated route lives under [`API_PREFIX`]. Signed object routes used by
//! the local storage backend live under [`OBJECTS_PREFIX`] and carry their own
//! HMAC credentials instead of a bearer token.

/// Current API version
pub const API_VERSION: &str = "v0";

/// Versioned prefix for authenticated routes
pub const API_PREFIX: &str = "/api/v0";

/// Path of the served OpenAPI document
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Prefix of the presigned object routes served for the local backend
pub const OBJECTS_PREFIX: &str = "/objects";

/// Multipart framing allowance added on top of the chunk size limit
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
