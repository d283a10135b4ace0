//! Archive naming, atomic staging and per-site retention.
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

pub mod error;
pub mod naming;
pub mod retention;
pub mod staged;

pub use error::{FsOpsError, FsOpsResult};
pub use naming::{ARCHIVE_SUFFIX, archive_file_name, archive_prefix, is_archive_of};
pub use retention::{RetentionFailure, RetentionOutcome, cleanup};
pub use staged::{STAGING_SUFFIX, StagedFile, staging_path};
