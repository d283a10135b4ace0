#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the httpbackup workspace.
//!
//! This crate centralises logging, metrics, and the process-wide context span so
//! the scheduler, the runner and the control API share one observability story.
//! Layout: `init.rs` (subscriber setup), `sink.rs` (stdout + file writer),
//! `context.rs` (application span), `metrics.rs` (Prometheus registry),
//! `error.rs` (telemetry errors).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;
pub mod sink;

pub use context::GlobalContextGuard;
pub use error::{Result, TelemetryError};
pub use init::{
    DEFAULT_LOG_LEVEL, LOG_FILE_ENV, LOG_FORMAT_ENV, LogFormat, LoggingConfig, build_sha,
    init_logging,
};
pub use metrics::{Metrics, MetricsSnapshot, SiteOutcomeLabel};
pub use sink::LogSink;
