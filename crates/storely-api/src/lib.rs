//! Storely API Library
//!
//! This crate provides the HTTP handlers, authentication middleware, and application setup
//! for the chunked upload service.

mod api_doc;
mod handlers;
mod telemetry;

// Public modules
pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
