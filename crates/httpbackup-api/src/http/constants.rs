//! Shared HTTP constants (headers, problem URIs, stream tuning).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_LAST_EVENT_ID: &str = "last-event-id";
pub(crate) const SSE_KEEP_ALIVE_SECS: u64 = 20;

pub(crate) const PROBLEM_INTERNAL: &str = "https://httpbackup.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://httpbackup.dev/problems/bad-request";
pub(crate) const PROBLEM_CONFIG_INVALID: &str = "https://httpbackup.dev/problems/config-invalid";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://httpbackup.dev/problems/service-unavailable";
