#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Messaging between the control surface, the scheduler and observers.
//!
//! Two channels live here. The control channel (`control.rs`) carries
//! `ConfigChanged`/`RunNow` requests into the scheduler over a small bounded
//! queue that never blocks the sender. The event bus (`routing.rs`) fans
//! scheduler and runner activity out to any number of observers and keeps a
//! replay ring so late subscribers can catch up.

pub mod control;
pub mod payloads;
pub mod routing;

pub use control::{
    CONTROL_CHANNEL_CAPACITY, ControlReceiver, ControlSender, ControlSignal, Delivery,
    control_channel,
};
pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId, RunTrigger};
pub use routing::{EventBus, EventStream};
