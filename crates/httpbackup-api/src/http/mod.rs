//! HTTP surface modules (router, handlers, problem responses).

/// Configuration read/write handlers.
pub mod config;
/// Shared constants and header names.
pub mod constants;
/// Problem response helpers and error types.
pub mod errors;
/// Event backlog and server-sent event stream.
pub mod events;
/// Health and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Manual run trigger.
pub mod run;
