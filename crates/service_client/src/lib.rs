//! Template service API client — shared between the CLI and future surfaces.
//!
//! This crate is the single place that performs HTTP against the external
//! schema-discovery and document-generation services. The engine only builds
//! payloads; callers hand them to this client.
//!
//! No GUI concepts. No retries. No progress bars.

mod client;

pub use client::{ServiceClient, ServiceError};
