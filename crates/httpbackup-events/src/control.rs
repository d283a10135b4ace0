//! Control channel from the control surface into the scheduler.
//!
//! # Design
//! - Bounded queue of [`CONTROL_CHANNEL_CAPACITY`]; sends never block.
//! - A full queue drops the new signal. The scheduler re-reads the whole
//!   configuration on `ConfigChanged`, so a dropped duplicate loses nothing.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Queue depth of the control channel.
pub const CONTROL_CHANNEL_CAPACITY: usize = 8;

/// Requests accepted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    /// The configuration document was edited; re-read it.
    ConfigChanged,
    /// Start a backup pass now (dropped if one is already running).
    RunNow,
}

/// Outcome of a non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The signal is queued.
    Queued,
    /// The queue was full and the signal was dropped.
    Dropped,
    /// The scheduler has stopped listening.
    Closed,
}

impl Delivery {
    /// Whether the signal reached the queue.
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }
}

/// Producer half, cloned into every control surface.
#[derive(Debug, Clone)]
pub struct ControlSender {
    inner: mpsc::Sender<ControlSignal>,
}

/// Consumer half, owned by the scheduler.
pub type ControlReceiver = mpsc::Receiver<ControlSignal>;

/// Create a control channel with the standard capacity.
#[must_use]
pub fn control_channel() -> (ControlSender, ControlReceiver) {
    let (inner, receiver) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    (ControlSender { inner }, receiver)
}

impl ControlSender {
    /// Queue `signal` without waiting.
    pub fn notify(&self, signal: ControlSignal) -> Delivery {
        match self.inner.try_send(signal) {
            Ok(()) => {
                debug!(?signal, "control signal queued");
                Delivery::Queued
            }
            Err(TrySendError::Full(_)) => {
                debug!(?signal, "control channel full; signal dropped");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                warn!(?signal, "control channel closed; signal dropped");
                Delivery::Closed
            }
        }
    }

    /// Notify the scheduler that the configuration changed.
    pub fn config_changed(&self) -> Delivery {
        self.notify(ControlSignal::ConfigChanged)
    }

    /// Ask the scheduler to start a pass.
    pub fn run_now(&self) -> Delivery {
        self.notify(ControlSignal::RunNow)
    }
}
