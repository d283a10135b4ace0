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

//! File-backed configuration for the backup scheduler.
//!
//! Layout: `model.rs` (typed config document), `validate.rs` (normalisation rules),
//! `defaults.rs` (default values and paths), `loader.rs` (`ConfigStore`, atomic
//! load/save).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_RETENTION, DEFAULT_WEB_LISTEN_ADDR, default_backup_folder,
    default_config_path, default_log_path,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigStore, load_or_create, save};
pub use model::{Config, Site};
pub use validate::normalize_interval;
