//! Scheduling loop that decides when a backup pass runs.
//!
//! # Design
//! - One control loop consumes ticks, control signals and shutdown serially; a pass
//!   runs on its own task so the loop keeps listening while it is in flight.
//! - [`RunState`] is the only overlap guard. A tick or `RunNow` that finds it taken
//!   is dropped, never queued.
//! - The timer is replaced, not mutated, when the interval changes. `0` disables it.
//! - Every run and every reload reads the document again; a failed read keeps the
//!   last good snapshot. A run reads it on its own task, never inside the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use httpbackup_config::{Config, ConfigStore};
use httpbackup_events::{ControlReceiver, ControlSignal, Event, EventBus, RunTrigger};
use httpbackup_runner::{BackupRunner, RunReport};
use httpbackup_telemetry::Metrics;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Length of one `IntervalMinutes` unit.
pub const TICK_UNIT: Duration = Duration::from_secs(60);

/// A full backup pass over one configuration snapshot.
#[async_trait]
pub trait BackupPass: Send + Sync + 'static {
    /// Back up every enabled site of `snapshot`, observing `cancel`.
    async fn run(
        &self,
        run_id: Uuid,
        snapshot: Arc<Config>,
        cancel: CancellationToken,
    ) -> RunReport;
}

#[async_trait]
impl BackupPass for BackupRunner {
    async fn run(
        &self,
        run_id: Uuid,
        snapshot: Arc<Config>,
        cancel: CancellationToken,
    ) -> RunReport {
        self.run_all(run_id, snapshot, cancel).await
    }
}

/// Process-wide "a pass is in progress" flag.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
}

impl RunState {
    /// Claim the flag; `None` when a pass is already running.
    #[must_use]
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                state: Arc::clone(self),
            })
    }

    /// Whether a pass currently holds the flag.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases [`RunState`] when dropped.
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<RunState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No timer; only `RunNow` starts a pass.
    Disabled,
    /// Timer armed, no pass in flight.
    Idle,
    /// A pass is in flight.
    Running,
}

struct SchedulerTimer {
    minutes: u64,
    interval: Option<Interval>,
}

impl SchedulerTimer {
    fn new(minutes: u64, unit: Duration) -> Self {
        let interval = (minutes > 0).then(|| {
            let period = unit.saturating_mul(u32::try_from(minutes).unwrap_or(u32::MAX));
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self { minutes, interval }
    }

    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Reads the document and remembers the last one that parsed.
#[derive(Clone)]
struct SnapshotSource {
    store: ConfigStore,
    events: EventBus,
    metrics: Metrics,
    last_good: Arc<RwLock<Arc<Config>>>,
}

impl SnapshotSource {
    fn current(&self) -> Arc<Config> {
        let guard = self.last_good.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    async fn refresh(&self) -> Option<Arc<Config>> {
        match self.store.load_or_create().await {
            Ok(config) => {
                let config = Arc::new(config);
                *self.last_good.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&config);
                Some(config)
            }
            Err(err) => {
                error!(
                    error = %err,
                    path = %self.store.path().display(),
                    "failed to reload config; keeping last good snapshot"
                );
                self.metrics.inc_config_reload_failure();
                self.events.publish(Event::ConfigReloadFailed {
                    message: err.to_string(),
                });
                None
            }
        }
    }

    async fn fresh(&self) -> Arc<Config> {
        self.refresh().await.unwrap_or_else(|| self.current())
    }
}

/// Owns the scheduling loop.
pub struct Orchestrator<P: BackupPass> {
    source: SnapshotSource,
    pass: Arc<P>,
    events: EventBus,
    metrics: Metrics,
    state: Arc<RunState>,
    tick_unit: Duration,
    in_flight: Option<JoinHandle<()>>,
}

impl<P: BackupPass> Orchestrator<P> {
    /// Build an orchestrator that starts from the already loaded `initial` document.
    #[must_use]
    pub fn new(
        store: ConfigStore,
        initial: Config,
        pass: Arc<P>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            source: SnapshotSource {
                store,
                events: events.clone(),
                metrics: metrics.clone(),
                last_good: Arc::new(RwLock::new(Arc::new(initial))),
            },
            pass,
            events,
            metrics,
            state: Arc::new(RunState::default()),
            tick_unit: TICK_UNIT,
            in_flight: None,
        }
    }

    /// Override the length of one interval unit.
    #[must_use]
    pub const fn with_tick_unit(mut self, unit: Duration) -> Self {
        self.tick_unit = unit;
        self
    }

    /// Shared handle to the overlap guard.
    #[must_use]
    pub fn run_state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// Current phase derived from the run flag and the configured interval.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        if self.state.is_running() {
            SchedulerPhase::Running
        } else if self.source.current().effective_interval_minutes() == 0 {
            SchedulerPhase::Disabled
        } else {
            SchedulerPhase::Idle
        }
    }

    /// Run the loop until `shutdown` is cancelled, then wait for the in-flight pass.
    pub async fn run(mut self, mut control: ControlReceiver, shutdown: CancellationToken) {
        let mut timer = SchedulerTimer::new(
            self.source.current().effective_interval_minutes(),
            self.tick_unit,
        );
        if timer.minutes == 0 {
            info!("scheduler disabled (IntervalMinutes=0)");
        } else {
            info!(interval_minutes = timer.minutes, "scheduler started");
        }

        let mut control_open = true;
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("shutdown requested; scheduler stopping");
                    break;
                }
                signal = control.recv(), if control_open => match signal {
                    Some(ControlSignal::ConfigChanged) => {
                        info!("configuration changed; reloading scheduler");
                        self.reload(&mut timer).await;
                    }
                    Some(ControlSignal::RunNow) => {
                        info!("manual run requested");
                        self.trigger(RunTrigger::Manual, &shutdown);
                    }
                    None => {
                        debug!("control channel closed; only the timer can start passes");
                        control_open = false;
                    }
                },
                () = timer.tick() => self.trigger(RunTrigger::Tick, &shutdown),
            }
        }

        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                info!("waiting for in-flight pass to wind down");
            }
            if let Err(err) = handle.await {
                error!(error = %err, "backup pass task failed");
            }
        }
        info!("scheduler stopped");
    }

    fn trigger(&mut self, trigger: RunTrigger, shutdown: &CancellationToken) {
        let Some(guard) = self.state.try_begin() else {
            warn!(%trigger, "run skipped: already running");
            self.metrics.inc_run_skipped(trigger.as_str());
            self.events.publish(Event::RunSkipped { trigger });
            return;
        };

        let source = self.source.clone();
        let run_id = Uuid::new_v4();
        let pass = Arc::clone(&self.pass);
        let events = self.events.clone();
        let metrics = self.metrics.clone();
        let cancel = shutdown.child_token();
        let span = info_span!("run", %run_id, %trigger);

        self.in_flight = Some(tokio::spawn(
            async move {
                let _guard = guard;
                let snapshot = source.fresh().await;
                let sites = snapshot.enabled_sites().count();
                info!(sites, "backup pass started");
                metrics.inc_run_started(trigger.as_str());
                events.publish(Event::RunStarted {
                    run_id,
                    trigger,
                    sites,
                });

                let report = pass.run(run_id, snapshot, cancel).await;

                metrics.observe_run_duration(report.duration);
                let duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX);
                info!(
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    skipped = report.skipped(),
                    duration_ms,
                    "backup pass completed"
                );
                events.publish(Event::RunCompleted {
                    run_id,
                    succeeded: report.succeeded(),
                    failed: report.failed(),
                    skipped: report.skipped(),
                    duration_ms,
                });
            }
            .instrument(span),
        ));
    }

    async fn reload(&self, timer: &mut SchedulerTimer) {
        let Some(config) = self.source.refresh().await else {
            return;
        };
        let minutes = config.effective_interval_minutes();
        if minutes == timer.minutes {
            debug!(interval_minutes = minutes, "scheduler interval unchanged");
            return;
        }

        let previous = timer.minutes;
        *timer = SchedulerTimer::new(minutes, self.tick_unit);
        match (previous, minutes) {
            (0, _) => info!(interval_minutes = minutes, "scheduler enabled"),
            (_, 0) => info!("scheduler disabled (IntervalMinutes=0)"),
            _ => info!(interval_minutes = minutes, "scheduler interval updated"),
        }
        self.events.publish(Event::SchedulerChanged {
            previous_minutes: previous,
            interval_minutes: minutes,
        });
    }
}
