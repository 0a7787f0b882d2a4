//! # Pulse Core
//!
//! The domain layer of the Pulse social backend: entities, the ports that
//! infrastructure implements, and the services that enforce post lifecycle,
//! follow graph, feed and engagement rules on top of those ports.
//! This crate has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, DomainResult};
