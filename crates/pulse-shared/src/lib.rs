//! # Pulse Shared
//!
//! Wire types for the HTTP API: validated request bodies, response
//! payloads and the RFC 7807 error body. Free of server dependencies so
//! clients can reuse it.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, Paginated};
