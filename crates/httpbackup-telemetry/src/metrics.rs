//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the scheduler and runner update.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Label recorded for each finished site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcomeLabel {
    /// Archive committed.
    Saved,
    /// Site failed.
    Failed,
    /// Site skipped because of shutdown.
    Skipped,
}

impl SiteOutcomeLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Prometheus-backed metrics registry shared across the process.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    runs_started_total: IntCounterVec,
    runs_skipped_total: IntCounterVec,
    site_outcomes_total: IntCounterVec,
    bytes_downloaded_total: IntCounter,
    archives_pruned_total: IntCounter,
    retention_failures_total: IntCounter,
    config_reload_failures_total: IntCounter,
    downloads_in_flight: IntGauge,
    last_run_duration_ms: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Downloads currently holding a slot.
    pub downloads_in_flight: i64,
    /// Duration of the most recent pass in milliseconds.
    pub last_run_duration_ms: i64,
    /// Total bytes committed to archives.
    pub bytes_downloaded_total: u64,
    /// Total archives deleted by retention.
    pub archives_pruned_total: u64,
    /// Total archives retention failed to delete.
    pub retention_failures_total: u64,
    /// Total failed configuration reloads.
    pub config_reload_failures_total: u64,
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let runs_started_total = counter_vec(
            "backup_runs_started_total",
            "Backup passes started by trigger",
            &["trigger"],
        )?;
        let runs_skipped_total = counter_vec(
            "backup_runs_skipped_total",
            "Triggers dropped because a pass was already running",
            &["trigger"],
        )?;
        let site_outcomes_total = counter_vec(
            "backup_site_outcomes_total",
            "Finished site backups by outcome",
            &["outcome"],
        )?;
        let bytes_downloaded_total = counter(
            "backup_bytes_downloaded_total",
            "Bytes committed to archives",
        )?;
        let archives_pruned_total =
            counter("backup_archives_pruned_total", "Archives deleted by retention")?;
        let retention_failures_total = counter(
            "backup_retention_failures_total",
            "Archives retention failed to delete",
        )?;
        let config_reload_failures_total = counter(
            "backup_config_reload_failures_total",
            "Configuration reloads that kept the last good snapshot",
        )?;
        let downloads_in_flight = gauge(
            "backup_downloads_in_flight",
            "Downloads currently holding a slot",
        )?;
        let last_run_duration_ms = gauge(
            "backup_last_run_duration_ms",
            "Duration of the most recent pass (ms)",
        )?;

        register(&registry, "backup_runs_started_total", &runs_started_total)?;
        register(&registry, "backup_runs_skipped_total", &runs_skipped_total)?;
        register(&registry, "backup_site_outcomes_total", &site_outcomes_total)?;
        register(&registry, "backup_bytes_downloaded_total", &bytes_downloaded_total)?;
        register(&registry, "backup_archives_pruned_total", &archives_pruned_total)?;
        register(
            &registry,
            "backup_retention_failures_total",
            &retention_failures_total,
        )?;
        register(
            &registry,
            "backup_config_reload_failures_total",
            &config_reload_failures_total,
        )?;
        register(&registry, "backup_downloads_in_flight", &downloads_in_flight)?;
        register(&registry, "backup_last_run_duration_ms", &last_run_duration_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                runs_started_total,
                runs_skipped_total,
                site_outcomes_total,
                bytes_downloaded_total,
                archives_pruned_total,
                retention_failures_total,
                config_reload_failures_total,
                downloads_in_flight,
                last_run_duration_ms,
            }),
        })
    }

    /// Count a started pass.
    pub fn inc_run_started(&self, trigger: &str) {
        self.inner
            .runs_started_total
            .with_label_values(&[trigger])
            .inc();
    }

    /// Count a trigger dropped by the overlap rule.
    pub fn inc_run_skipped(&self, trigger: &str) {
        self.inner
            .runs_skipped_total
            .with_label_values(&[trigger])
            .inc();
    }

    /// Count a finished site.
    pub fn inc_site_outcome(&self, outcome: SiteOutcomeLabel) {
        self.inner
            .site_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Add committed archive bytes.
    pub fn add_bytes_downloaded(&self, bytes: u64) {
        self.inner.bytes_downloaded_total.inc_by(bytes);
    }

    /// Record a retention pass.
    pub fn record_retention(&self, removed: usize, failed: usize) {
        self.inner
            .archives_pruned_total
            .inc_by(u64::try_from(removed).unwrap_or(u64::MAX));
        self.inner
            .retention_failures_total
            .inc_by(u64::try_from(failed).unwrap_or(u64::MAX));
    }

    /// Count a failed configuration reload.
    pub fn inc_config_reload_failure(&self) {
        self.inner.config_reload_failures_total.inc();
    }

    /// A download acquired its slot.
    pub fn download_started(&self) {
        self.inner.downloads_in_flight.inc();
    }

    /// A download released its slot.
    pub fn download_finished(&self) {
        self.inner.downloads_in_flight.dec();
    }

    /// Record the duration of the most recent pass.
    pub fn observe_run_duration(&self, duration: Duration) {
        self.inner
            .last_run_duration_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            downloads_in_flight: self.inner.downloads_in_flight.get(),
            last_run_duration_ms: self.inner.last_run_duration_ms.get(),
            bytes_downloaded_total: self.inner.bytes_downloaded_total.get(),
            archives_pruned_total: self.inner.archives_pruned_total.get(),
            retention_failures_total: self.inner.retention_failures_total.get(),
            config_reload_failures_total: self.inner.config_reload_failures_total.get(),
        }
    }

    /// Number of passes started by `trigger`.
    #[must_use]
    pub fn runs_started(&self, trigger: &str) -> u64 {
        self.inner
            .runs_started_total
            .with_label_values(&[trigger])
            .get()
    }

    /// Number of triggers of kind `trigger` dropped by the overlap rule.
    #[must_use]
    pub fn runs_skipped(&self, trigger: &str) -> u64 {
        self.inner
            .runs_skipped_total
            .with_label_values(&[trigger])
            .get()
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}
