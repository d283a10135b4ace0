//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: httpbackup_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: httpbackup_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: httpbackup_telemetry::TelemetryError,
    },
    /// The download runner could not be constructed.
    #[error("runner construction failed")]
    Runner {
        /// Operation identifier.
        operation: &'static str,
        /// Source runner error.
        source: httpbackup_runner::RunnerError,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Join {
        /// Task name.
        task: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: httpbackup_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: httpbackup_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: httpbackup_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn runner(
        operation: &'static str,
        source: httpbackup_runner::RunnerError,
    ) -> Self {
        Self::Runner { operation, source }
    }

    pub(crate) const fn join(task: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Join { task, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config("load", httpbackup_config::ConfigError::EmptyPath);
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let api = AppError::api_server(
            "serve",
            httpbackup_api::ApiServerError::Serve {
                source: io::Error::other("io"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { operation: "serve", .. }));
    }

    #[tokio::test]
    async fn join_errors_keep_task_name() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let Err(source) = handle.await else {
            panic!("aborted task should fail to join");
        };
        let err = AppError::join("api", source);
        assert!(matches!(err, AppError::Join { task: "api", .. }));
    }
}
