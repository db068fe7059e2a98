//! # Event subscribers for flow observability.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery
//! that delivers [`Event`](crate::events::Event)s to user hooks without
//! blocking the engine.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──► SubscriberSet::emit(Arc<Event>)
//!                          ├──► [queue 1] ──► worker 1 ──► sub1.on_event()
//!                          ├──► [queue 2] ──► worker 2 ──► sub2.on_event()
//!                          └──► [queue N] ──► worker N ──► subN.on_event()
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use flowvisor::{Event, EventKind, Subscribe};
//!
//! struct Metrics;
//!
//! #[async_trait]
//! impl Subscribe for Metrics {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::UnitFailed {
//!             // increment failure counter
//!         }
//!     }
//!     fn name(&self) -> &'static str { "metrics" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
