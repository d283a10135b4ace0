//! Bounded-parallel backup pass.
//!
//! # Design
//! - One task per enabled site, admitted through a semaphore of `max_parallel`
//!   permits. The permit is an owned guard, so it is released on every exit path.
//! - A site never fails its siblings: every task returns a [`SiteReport`], and a
//!   task that dies without one is reported as aborted.
//! - Cancellation is checked before admission, while the request is pending and
//!   between body chunks. An interrupted site leaves no archive behind because the
//!   staged file removes itself on drop.
//! - Retention runs after a successful commit and its result is only logged.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use futures_util::StreamExt;
use httpbackup_config::{Config, Site};
use httpbackup_events::{Event, EventBus};
use httpbackup_fsops::{StagedFile, archive_file_name, cleanup};
use httpbackup_telemetry::{Metrics, SiteOutcomeLabel};
use reqwest::{Client, Response};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{RunnerError, SiteError};
use crate::report::{RunReport, SiteOutcome, SiteReport};
use crate::settings::{RunnerSettings, USER_AGENT};

const SNIPPET_LIMIT: usize = 512;

/// Downloads archives for a configuration snapshot.
#[derive(Clone)]
pub struct BackupRunner {
    client: Client,
    settings: RunnerSettings,
    events: EventBus,
    metrics: Metrics,
}

impl BackupRunner {
    /// Build a runner with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        settings: RunnerSettings,
        events: EventBus,
        metrics: Metrics,
    ) -> Result<Self, RunnerError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| RunnerError::ClientBuild { source })?;
        Ok(Self {
            client,
            settings,
            events,
            metrics,
        })
    }

    /// Settings the runner was built with.
    #[must_use]
    pub const fn settings(&self) -> RunnerSettings {
        self.settings
    }

    /// Back up every enabled site of `snapshot`.
    ///
    /// Returns once every site has finished, failed or been skipped.
    pub async fn run_all(
        &self,
        run_id: Uuid,
        snapshot: Arc<Config>,
        cancel: CancellationToken,
    ) -> RunReport {
        let started = Instant::now();
        let sites: Vec<Site> = snapshot.enabled_sites().cloned().collect();
        if sites.is_empty() {
            debug!(%run_id, "no enabled sites; nothing to back up");
            return RunReport {
                run_id,
                sites: Vec::new(),
                duration: started.elapsed(),
            };
        }

        let gate = Arc::new(Semaphore::new(self.settings.max_parallel.max(1)));
        let mut tasks = JoinSet::new();
        for (index, site) in sites.iter().cloned().enumerate() {
            let runner = self.clone();
            let snapshot = Arc::clone(&snapshot);
            let gate = Arc::clone(&gate);
            let cancel = cancel.clone();
            let span = info_span!("site", %run_id, site = %site.name.trim());
            tasks.spawn(
                async move {
                    let report = runner
                        .admit_and_run(run_id, &snapshot, site, gate, &cancel)
                        .await;
                    (index, report)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<SiteReport>> = sites.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(report);
                    }
                }
                Err(err) => error!(%run_id, error = %err, "site task ended abnormally"),
            }
        }

        let reports = slots
            .into_iter()
            .zip(&sites)
            .map(|(slot, site)| {
                slot.unwrap_or_else(|| {
                    let error = SiteError::Aborted;
                    self.record_failed(run_id, site.name.trim(), &error);
                    SiteReport {
                        site: site.name.trim().to_string(),
                        outcome: SiteOutcome::Failed { error },
                    }
                })
            })
            .collect();

        RunReport {
            run_id,
            sites: reports,
            duration: started.elapsed(),
        }
    }

    /// Back up a single site: validate, download, commit, then apply retention.
    pub async fn run_one(
        &self,
        run_id: Uuid,
        snapshot: &Config,
        site: &Site,
        cancel: &CancellationToken,
    ) -> SiteOutcome {
        let name = site.name.trim();
        match self.download(snapshot, site, cancel).await {
            Ok((path, bytes)) => {
                self.record_saved(run_id, name, &path, bytes);
                self.apply_retention(run_id, snapshot, name).await;
                SiteOutcome::Saved { path, bytes }
            }
            Err(SiteError::Cancelled) => {
                info!("site interrupted by shutdown");
                self.metrics.inc_site_outcome(SiteOutcomeLabel::Skipped);
                SiteOutcome::Skipped
            }
            Err(error) => {
                self.record_failed(run_id, name, &error);
                SiteOutcome::Failed { error }
            }
        }
    }

    async fn admit_and_run(
        &self,
        run_id: Uuid,
        snapshot: &Config,
        site: Site,
        gate: Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> SiteReport {
        let name = site.name.trim().to_string();
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            permit = gate.acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            debug!("shutdown before admission; skipping site");
            self.metrics.inc_site_outcome(SiteOutcomeLabel::Skipped);
            return SiteReport {
                site: name,
                outcome: SiteOutcome::Skipped,
            };
        };

        let _in_flight = InFlight::enter(&self.metrics);
        let outcome = self.run_one(run_id, snapshot, &site, cancel).await;
        SiteReport {
            site: name,
            outcome,
        }
    }

    async fn download(
        &self,
        snapshot: &Config,
        site: &Site,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, u64), SiteError> {
        let name = site.name.trim();
        let url = site.url.trim();
        validate_site(name, url)?;

        let dir = snapshot.site_dir(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SiteError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        let final_path = dir.join(archive_file_name(name, Local::now()));

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(SiteError::Cancelled),
            sent = self.client.get(url).send() => sent.map_err(|source| SiteError::Request { source })?,
        };
        let status = response.status();
        if !status.is_success() {
            let snippet = read_snippet(response).await;
            return Err(SiteError::Status {
                status: status.as_u16(),
                snippet,
            });
        }

        let mut staged = StagedFile::create(&final_path).await?;
        let mut body = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SiteError::Cancelled),
                next = body.next() => next,
            };
            match next {
                Some(Ok(chunk)) => staged.write_chunk(&chunk).await?,
                Some(Err(source)) => return Err(SiteError::Body { source }),
                None => break,
            }
        }
        let bytes = staged.bytes_written();
        let path = staged.commit().await?;
        Ok((path, bytes))
    }

    async fn apply_retention(&self, run_id: Uuid, snapshot: &Config, name: &str) {
        let dir = snapshot.site_dir(name);
        let keep = snapshot.retention;
        let site = name.to_string();
        match tokio::task::spawn_blocking(move || cleanup(&dir, &site, keep)).await {
            Ok(Ok(outcome)) => {
                self.metrics
                    .record_retention(outcome.removed.len(), outcome.failures.len());
                if !outcome.is_clean() {
                    warn!(
                        failed = outcome.failures.len(),
                        "retention left archives it could not delete"
                    );
                }
                self.events.publish(Event::RetentionApplied {
                    run_id,
                    site: name.to_string(),
                    removed: outcome.removed.len(),
                    failed: outcome.failures.len(),
                });
            }
            Ok(Err(err)) => warn!(error = %err, "retention skipped: site directory unreadable"),
            Err(err) => warn!(error = %err, "retention task failed"),
        }
    }

    fn record_saved(&self, run_id: Uuid, name: &str, path: &Path, bytes: u64) {
        info!(path = %path.display(), bytes, "archive committed");
        self.metrics.inc_site_outcome(SiteOutcomeLabel::Saved);
        self.metrics.add_bytes_downloaded(bytes);
        self.events.publish(Event::SiteBackedUp {
            run_id,
            site: name.to_string(),
            path: path.display().to_string(),
            bytes,
        });
    }

    fn record_failed(&self, run_id: Uuid, name: &str, error: &SiteError) {
        let message = error.detail();
        warn!(kind = error.kind().as_str(), error = %message, "site backup failed");
        self.metrics.inc_site_outcome(SiteOutcomeLabel::Failed);
        self.events.publish(Event::SiteFailed {
            run_id,
            site: name.to_string(),
            message,
        });
    }
}

struct InFlight<'a> {
    metrics: &'a Metrics,
}

impl<'a> InFlight<'a> {
    fn enter(metrics: &'a Metrics) -> Self {
        metrics.download_started();
        Self { metrics }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics.download_finished();
    }
}

fn validate_site(name: &str, url: &str) -> Result<(), SiteError> {
    if name.is_empty() {
        return Err(SiteError::EmptyField { field: "name" });
    }
    if url.is_empty() {
        return Err(SiteError::EmptyField { field: "url" });
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SiteError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

async fn read_snippet(response: Response) -> String {
    let mut collected = Vec::with_capacity(SNIPPET_LIMIT);
    let mut body = response.bytes_stream();
    while collected.len() < SNIPPET_LIMIT {
        match body.next().await {
            Some(Ok(chunk)) => collected.extend_from_slice(&chunk),
            _ => break,
        }
    }
    collected.truncate(SNIPPET_LIMIT);
    String::from_utf8_lossy(&collected).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_blank_and_unsafe_names() {
        assert!(matches!(
            validate_site("", "http://x"),
            Err(SiteError::EmptyField { field: "name" })
        ));
        assert!(matches!(
            validate_site("shop", ""),
            Err(SiteError::EmptyField { field: "url" })
        ));
        for name in ["..", ".", "a/b", "a\\b"] {
            assert!(matches!(
                validate_site(name, "http://x"),
                Err(SiteError::InvalidName { .. })
            ));
        }
        assert!(validate_site("Shop 1", "http://x").is_ok());
    }
}
