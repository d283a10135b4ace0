//! Observability event bus.
//!
//! The bus assigns sequential identifiers and keeps a bounded replay ring so a
//! subscriber that reconnects with the last id it saw receives what it missed.
//! Internally it uses `tokio::broadcast`; a lagging subscriber loses the oldest
//! events instead of slowing publishers down.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Stream of envelopes: replayed backlog first, then live events.
pub type EventStream = Pin<Box<dyn Stream<Item = EventEnvelope> + Send>>;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity (minimum 1).
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish an event and return its identifier.
    pub fn publish(&self, event: Event) -> EventId {
        let envelope = {
            let mut replay = self.lock_replay();
            let envelope = EventEnvelope {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                timestamp: Utc::now(),
                event,
            };
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
            envelope
        };
        let id = envelope.id;
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to live events, replaying buffered events newer than `last_event_id`.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        let receiver = self.sender.subscribe();
        let backlog = last_event_id.map_or_else(Vec::new, |id| self.backlog_since(id));
        let floor = backlog
            .last()
            .map(|env| env.id)
            .or(last_event_id)
            .unwrap_or(0);
        let live = BroadcastStream::new(receiver)
            .filter_map(Result::ok)
            .filter(move |env| env.id > floor);
        Box::pin(tokio_stream::iter(backlog).chain(live))
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        self.lock_replay()
            .iter()
            .filter(|env| env.id > id)
            .cloned()
            .collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
