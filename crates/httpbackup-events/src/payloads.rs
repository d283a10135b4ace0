//! Event payload types published by the scheduler and the runner.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each event published on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// What caused a backup pass to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    /// The periodic scheduler tick.
    Tick,
    /// An explicit run-now request.
    Manual,
}

impl RunTrigger {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed activity events surfaced to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A backup pass started.
    RunStarted {
        /// Identifier shared by every event of the pass.
        run_id: Uuid,
        /// What started the pass.
        trigger: RunTrigger,
        /// Number of enabled sites in the snapshot.
        sites: usize,
    },
    /// A trigger arrived while a pass was already running and was dropped.
    RunSkipped {
        /// The dropped trigger.
        trigger: RunTrigger,
    },
    /// An archive was committed for a site.
    SiteBackedUp {
        /// Pass identifier.
        run_id: Uuid,
        /// Site name.
        site: String,
        /// Final archive path.
        path: String,
        /// Bytes written.
        bytes: u64,
    },
    /// A site failed; siblings are unaffected.
    SiteFailed {
        /// Pass identifier.
        run_id: Uuid,
        /// Site name (may be empty when the entry had none).
        site: String,
        /// Rendered failure.
        message: String,
    },
    /// Retention ran for a site after a successful backup.
    RetentionApplied {
        /// Pass identifier.
        run_id: Uuid,
        /// Site name.
        site: String,
        /// Archives deleted.
        removed: usize,
        /// Archives that could not be deleted.
        failed: usize,
    },
    /// A backup pass finished.
    RunCompleted {
        /// Pass identifier.
        run_id: Uuid,
        /// Sites committed.
        succeeded: usize,
        /// Sites that failed.
        failed: usize,
        /// Sites skipped because of shutdown.
        skipped: usize,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// The scheduler interval changed; `0` means disabled.
    SchedulerChanged {
        /// Previous interval in minutes.
        previous_minutes: u64,
        /// New interval in minutes.
        interval_minutes: u64,
    },
    /// Reloading the configuration failed; the last good snapshot stays active.
    ConfigReloadFailed {
        /// Rendered failure.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RunSkipped { .. } => "run_skipped",
            Self::SiteBackedUp { .. } => "site_backed_up",
            Self::SiteFailed { .. } => "site_failed",
            Self::RetentionApplied { .. } => "retention_applied",
            Self::RunCompleted { .. } => "run_completed",
            Self::SchedulerChanged { .. } => "scheduler_changed",
            Self::ConfigReloadFailed { .. } => "config_reload_failed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Publication time.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub event: Event,
}
