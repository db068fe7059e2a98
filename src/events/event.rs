//! # Runtime events emitted by the flow engine.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Flow events**: lifecycle of the flow as a whole (started, finished,
//!   failed, canceled)
//! - **Unit events**: per-attempt execution flow (starting, succeeded,
//!   failed, retry scheduled) plus gate checks
//! - **Subscriber events**: delivery problems in the fan-out itself
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! unit name and submission order, attempt numbers, gate verdicts, and
//! reason strings, attached via `with_*` combinators.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order.
//!
//! ## Example
//! ```rust
//! use flowvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::UnitFailed)
//!     .with_unit("fetch")
//!     .with_order(2)
//!     .with_attempt(3)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::UnitFailed);
//! assert_eq!(ev.unit.as_deref(), Some("fetch"));
//! assert_eq!(ev.order, Some(2));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of flow runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Flow lifecycle events ===
    /// The flow left `Queued` and began executing.
    ///
    /// Sets: `at`, `seq`.
    FlowStarted,

    /// The flow reached `Finished`.
    ///
    /// Sets: `at`, `seq`.
    FlowFinished,

    /// The flow reached `Failed`.
    ///
    /// Sets: `reason` (terminal error), `at`, `seq`.
    FlowFailed,

    /// The flow reached `Canceled`.
    ///
    /// Sets: `at`, `seq`.
    FlowCanceled,

    // === Unit lifecycle events ===
    /// A unit is starting an attempt.
    ///
    /// Sets: `unit`, `order`, `attempt` (1-based), `at`, `seq`.
    UnitStarting,

    /// A unit attempt produced its value.
    ///
    /// Sets: `unit`, `order`, `attempt`, `at`, `seq`.
    UnitSucceeded,

    /// A unit reported its terminal failure (retries exhausted or fatal).
    ///
    /// Sets: `unit`, `order`, `attempt`, `reason`, `at`, `seq`.
    UnitFailed,

    /// A retryable failure consumed budget; the same closure re-runs.
    ///
    /// Sets: `unit`, `order`, `attempt` (the failed attempt), `reason`,
    /// `at`, `seq`.
    RetryScheduled,

    /// The validation gate was evaluated.
    ///
    /// Sets: `unit` (gate name), `verdict` (absent on gate error),
    /// `reason` (on gate error), `at`, `seq`.
    GateChecked,

    // === Subscriber events ===
    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `unit` (subscriber name), `reason`, `at`, `seq`.
    SubscriberOverflow,

    /// A subscriber panicked while processing an event.
    ///
    /// Sets: `unit` (subscriber name), `reason` (panic message), `at`, `seq`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Unit, gate, or subscriber name, if applicable.
    pub unit: Option<Arc<str>>,
    /// Submission index of the unit, if applicable.
    pub order: Option<usize>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Gate verdict, for [`EventKind::GateChecked`].
    pub verdict: Option<bool>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            order: None,
            attempt: None,
            verdict: None,
            reason: None,
        }
    }

    /// Attaches a unit/gate/subscriber name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches the unit's submission index.
    #[inline]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a gate verdict.
    #[inline]
    pub fn with_verdict(mut self, verdict: bool) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_unit(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_unit(subscriber)
            .with_reason(info)
    }

    /// `true` for events reporting fan-out trouble (used to avoid
    /// publishing overflow reports about overflow reports).
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
