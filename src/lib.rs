#![deny(missing_docs)]

//! Core library for askdocs: answer questions about uploaded documents through any of several
//! text-generation backends.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Excerpt ordering and bounded context assembly.
pub mod context;
/// Error taxonomy returned by the orchestrator.
pub mod errors;
/// Structured logging and tracing setup.
pub mod logging;
/// Removal of backend reasoning traces from answers.
pub mod normalize;
/// The `answer` operation.
pub mod orchestrator;
/// Backend registry, descriptors and HTTP transport.
pub mod providers;
