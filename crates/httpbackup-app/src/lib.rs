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

//! httpbackup application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (process wiring and signals), `orchestrator.rs`
//! (scheduling loop), `error.rs` (application errors).

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;
/// Scheduling loop and overlap guard.
pub mod orchestrator;

pub use bootstrap::{CONFIG_PATH_ENV, run_app};
pub use error::{AppError, AppResult};
pub use orchestrator::{
    BackupPass, Orchestrator, RunGuard, RunState, SchedulerPhase, TICK_UNIT,
};
