//! Outcomes of a backup pass.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::error::SiteError;

/// What happened to one site.
#[derive(Debug)]
pub enum SiteOutcome {
    /// The archive was committed.
    Saved {
        /// Final archive path.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// The site failed; siblings are unaffected.
    Failed {
        /// Failure detail.
        error: SiteError,
    },
    /// Shutdown arrived before or during the download.
    Skipped,
}

/// Outcome for one enabled site, in document order.
#[derive(Debug)]
pub struct SiteReport {
    /// Site name as configured (trimmed).
    pub site: String,
    /// Result of the attempt.
    pub outcome: SiteOutcome,
}

impl SiteReport {
    /// Whether an archive was committed.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self.outcome, SiteOutcome::Saved { .. })
    }
}

/// Outcome of a full pass.
#[derive(Debug)]
pub struct RunReport {
    /// Pass identifier shared with published events.
    pub run_id: Uuid,
    /// Per-site outcomes in document order.
    pub sites: Vec<SiteReport>,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl RunReport {
    /// Sites with a committed archive.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.sites.iter().filter(|site| site.is_saved()).count()
    }

    /// Sites that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.sites
            .iter()
            .filter(|site| matches!(site.outcome, SiteOutcome::Failed { .. }))
            .count()
    }

    /// Sites skipped because of shutdown.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.sites
            .iter()
            .filter(|site| matches!(site.outcome, SiteOutcome::Skipped))
            .count()
    }

    /// Outcome for `site`, if it was part of the pass.
    #[must_use]
    pub fn site(&self, site: &str) -> Option<&SiteReport> {
        self.sites.iter().find(|report| report.site == site)
    }
}
