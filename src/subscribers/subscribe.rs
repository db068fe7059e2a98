//! # Subscriber trait for lifecycle events.

use async_trait::async_trait;

use crate::events::Event;

/// # Hook into flow lifecycle events.
///
/// Each subscriber gets a dedicated bounded queue and worker task, so a
/// slow or panicking subscriber cannot stall the engine or its peers —
/// at worst it loses events (reported as
/// [`SubscriberOverflow`](crate::events::EventKind::SubscriberOverflow)).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes one event.
    ///
    /// Runs on the subscriber's own worker task; events arrive in per-
    /// subscriber FIFO order.
    async fn on_event(&self, event: &Event);

    /// Returns a stable subscriber name for diagnostics.
    fn name(&self) -> &'static str {
        "subscriber"
    }

    /// Capacity of this subscriber's queue (clamped to ≥ 1).
    fn queue_capacity(&self) -> usize {
        256
    }
}
