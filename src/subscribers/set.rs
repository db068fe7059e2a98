//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to subscribers concurrently
//! without blocking the publisher.
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Overflow**: the event is dropped for that subscriber only, and a
//!   `SubscriberOverflow` event is published (never for overflow events
//!   themselves, so trouble reports cannot feed back on themselves)
//! - **Isolation**: each subscriber has a dedicated queue and worker; a
//!   panic is caught, reported as `SubscriberPanicked`, and the worker
//!   keeps processing
//! - **Per-subscriber FIFO**: each subscriber sees events in order; there
//!   is no cross-subscriber ordering

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};

use crate::error::panic_reason;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct Channel {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<Channel>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a set and spawns one worker task per subscriber.
    ///
    /// Workers run until their queue closes (when the set is dropped).
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subscribers.len());
        for sub in subscribers {
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let name = sub.name();
            let worker_bus = bus.clone();
            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
                    if let Err(panic) = handled {
                        worker_bus.publish(Event::subscriber_panicked(
                            name,
                            panic_reason(panic.as_ref()),
                        ));
                    }
                }
            });
            channels.push(Channel { name, tx });
        }
        Self { channels, bus }
    }

    /// Hands one event to every subscriber queue without waiting.
    pub fn emit(&self, ev: Arc<Event>) {
        for ch in &self.channels {
            match ch.tx.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !ev.is_subscriber_event() {
                        self.bus.publish(Event::subscriber_overflow(ch.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !ev.is_subscriber_event() {
                        self.bus
                            .publish(Event::subscriber_overflow(ch.name, "closed"));
                    }
                }
            }
        }
    }

    /// Bridges a [`Bus`] into a new set: subscribes to the bus and forwards
    /// every event until the bus closes.
    pub(crate) fn listen(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) {
        let set = SubscriberSet::new(subscribers, bus.clone());
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
