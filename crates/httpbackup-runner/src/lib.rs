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

//! Download runner: fetches every enabled site of a configuration snapshot with
//! bounded parallelism, commits each archive atomically, then applies retention.
//!
//! Layout: `settings.rs` (parallelism and HTTP client settings), `error.rs`
//! (per-site failures), `report.rs` (run and site outcomes), `runner.rs`
//! (`BackupRunner`).

pub mod error;
pub mod report;
pub mod runner;
pub mod settings;

pub use error::{RunnerError, SiteError, SiteErrorKind};
pub use report::{RunReport, SiteOutcome, SiteReport};
pub use runner::BackupRunner;
pub use settings::{
    DEFAULT_MAX_PARALLEL, MAX_PARALLEL_ENV, REQUEST_TIMEOUT, RunnerSettings, USER_AGENT,
};
