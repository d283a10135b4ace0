//! Runner settings resolved once at startup.

use std::time::Duration;

use tracing::warn;

/// Admission gate size when no override is supplied.
pub const DEFAULT_MAX_PARALLEL: usize = 5;
/// Environment variable overriding the admission gate size.
pub const MAX_PARALLEL_ENV: &str = "HTTPBACKUP_MAX_PARALLEL";
/// Total timeout for one archive request, body included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// User agent sent with every archive request.
pub const USER_AGENT: &str = "httpBackupGo/1.0";

/// Tunables for [`crate::BackupRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Maximum concurrent downloads per pass.
    pub max_parallel: usize,
    /// Total per-request timeout.
    pub request_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl RunnerSettings {
    /// Defaults with `HTTPBACKUP_MAX_PARALLEL` applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_parallel: parse_max_parallel(std::env::var(MAX_PARALLEL_ENV).ok().as_deref()),
            ..Self::default()
        }
    }

    /// Override the admission gate size; `0` falls back to the default.
    #[must_use]
    pub const fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = if max_parallel == 0 {
            DEFAULT_MAX_PARALLEL
        } else {
            max_parallel
        };
        self
    }
}

/// Positive integers override the default; anything else is ignored.
fn parse_max_parallel(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_MAX_PARALLEL;
    };
    match raw.parse::<i64>() {
        Ok(value) if value > 0 => usize::try_from(value).unwrap_or(DEFAULT_MAX_PARALLEL),
        _ => {
            warn!(value = raw, "ignoring invalid {MAX_PARALLEL_ENV}");
            DEFAULT_MAX_PARALLEL
        }
    }
}
