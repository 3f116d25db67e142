//! Data models for the application
//!
//! Records persisted by the ledgers and the request/response shapes of the
//! upload API, organized by domain.

mod chunk;
mod file;
mod quota;
mod upload;

// Re-export all models for convenient imports
pub use chunk::*;
pub use file::*;
pub use quota::*;
pub use upload::*;
