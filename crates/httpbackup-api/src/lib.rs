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

//! Control API for the backup scheduler.
//!
//! A thin JSON surface over the configuration store and the scheduler's control
//! channel, plus read-only views of the observability event bus and metrics.
//! Layout: `state.rs` (shared handler state), `error.rs` (server errors),
//! `http/` (router, handlers, problem responses).

pub mod error;
pub mod http;
pub mod state;

pub use error::{ApiServerError, ApiServerResult, parse_listen_addr};
pub use http::router::ApiServer;
pub use state::ApiState;
