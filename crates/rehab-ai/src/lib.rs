//! Rehabilitation recommendation and resource-assignment engine.
//!
//! The library is organized around the `rehabilitation` workflow module, with
//! configuration, telemetry, and the top-level HTTP error type alongside it.
//! Storage and event transports are trait seams so the service can run
//! against the bundled in-memory infrastructure or a real backend.

pub mod config;
pub mod error;
pub mod rehabilitation;
pub mod telemetry;
