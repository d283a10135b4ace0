//! Shared state handed to every handler.

use httpbackup_config::ConfigStore;
use httpbackup_events::{ControlSender, EventBus};
use httpbackup_telemetry::Metrics;

/// Handles the control API needs from the rest of the process.
pub struct ApiState {
    pub(crate) store: ConfigStore,
    pub(crate) control: ControlSender,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
}

impl ApiState {
    /// Bundle the configuration store, the scheduler's control channel, the event
    /// bus and the metrics registry.
    #[must_use]
    pub const fn new(
        store: ConfigStore,
        control: ControlSender,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            control,
            events,
            metrics,
        }
    }
}
