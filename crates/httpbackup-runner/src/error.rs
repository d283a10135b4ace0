//! # Design
//!
//! - Every per-site failure is a [`SiteError`]; it never escapes the site's task.
//! - [`SiteErrorKind`] groups failures into validation, network and storage classes
//!   for logs and reports.

use std::error::Error as _;
use std::io;
use std::path::PathBuf;

use httpbackup_fsops::FsOpsError;
use thiserror::Error;

/// Failure class of a [`SiteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteErrorKind {
    /// The site entry itself is unusable.
    Validation,
    /// Connection, timeout or non-success response.
    Network,
    /// Directory creation, write, sync or rename.
    Storage,
    /// Shutdown interrupted the site.
    Cancelled,
}

impl SiteErrorKind {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why a single site produced no archive.
#[derive(Debug, Error)]
pub enum SiteError {
    /// A required field was blank after trimming.
    #[error("site {field} is empty")]
    EmptyField {
        /// `name` or `url`.
        field: &'static str,
    },
    /// The name cannot be used as a directory name.
    #[error("site name {name:?} is not a valid directory name")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// The site directory could not be created.
    #[error("failed to create site directory")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The request could not be sent or timed out.
    #[error("request failed")]
    Request {
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("unexpected http status {status}: {snippet}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Trimmed start of the response body (at most 512 bytes).
        snippet: String,
    },
    /// Reading the response body failed part way.
    #[error("response body failed")]
    Body {
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// Staging or committing the archive failed.
    #[error("archive write failed")]
    Storage {
        /// Underlying filesystem error.
        #[from]
        source: FsOpsError,
    },
    /// Shutdown was signalled while the site was in flight.
    #[error("cancelled by shutdown")]
    Cancelled,
    /// The site task ended without reporting.
    #[error("site task aborted")]
    Aborted,
}

impl SiteError {
    /// Failure class.
    #[must_use]
    pub const fn kind(&self) -> SiteErrorKind {
        match self {
            Self::EmptyField { .. } | Self::InvalidName { .. } => SiteErrorKind::Validation,
            Self::Request { .. } | Self::Status { .. } | Self::Body { .. } => {
                SiteErrorKind::Network
            }
            Self::CreateDir { .. } | Self::Storage { .. } | Self::Aborted => {
                SiteErrorKind::Storage
            }
            Self::Cancelled => SiteErrorKind::Cancelled,
        }
    }

    /// Message followed by every source in the chain, `: `-separated.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            rendered.push_str(": ");
            rendered.push_str(&err.to_string());
            source = err.source();
        }
        rendered
    }
}

/// Errors raised while constructing the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The HTTP client could not be built.
    #[error("failed to build http client")]
    ClientBuild {
        /// Underlying client error.
        source: reqwest::Error,
    },
}
