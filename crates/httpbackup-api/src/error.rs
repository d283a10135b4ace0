//! # Design
//!
//! - Provide a single crate-level error type for API server bind/serve failures.
//! - Keep error messages constant; capture operational context in structured fields.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

/// Result alias for API server operations.
pub type ApiServerResult<T> = std::result::Result<T, ApiServerError>;

/// Errors raised while binding or serving the API.
#[derive(Debug)]
pub enum ApiServerError {
    /// The configured listen address could not be parsed.
    InvalidListenAddr {
        /// Address as written in the configuration.
        value: String,
        /// Underlying parse error.
        source: std::net::AddrParseError,
    },
    /// Binding the API listener failed.
    Bind {
        /// Address attempted.
        addr: SocketAddr,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Serving the API failed.
    Serve {
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl Display for ApiServerError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidListenAddr { .. } => formatter.write_str("invalid api listen address"),
            Self::Bind { .. } => formatter.write_str("failed to bind api listener"),
            Self::Serve { .. } => formatter.write_str("api server terminated unexpectedly"),
        }
    }
}

impl Error for ApiServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidListenAddr { source, .. } => Some(source),
            Self::Bind { source, .. } | Self::Serve { source } => Some(source),
        }
    }
}

/// Parse `WebListenAddr` into a socket address.
///
/// # Errors
///
/// Returns [`ApiServerError::InvalidListenAddr`] when the value is not `host:port`.
pub fn parse_listen_addr(value: &str) -> ApiServerResult<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|source| ApiServerError::InvalidListenAddr {
            value: value.to_string(),
            source,
        })
}
