//! # Lifecycle events published by the flow engine.
//!
//! This module provides the observability backbone:
//! - [`Event`] / [`EventKind`] - what happened, with optional metadata
//! - [`Bus`] - broadcast channel carrying events to subscribers
//!
//! ## Event flow
//! ```text
//! runner / drive ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                       │
//!                                       └──► Flow::events() (raw tap)
//! ```

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
