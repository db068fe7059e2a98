//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [flow-started]
//! [starting] unit=unit-0 order=0 attempt=1
//! [succeeded] unit=unit-0 order=0
//! [retry] unit=unit-1 order=1 after_attempt=1 err="execution failed: boom"
//! [gate] name=countdown verdict=false
//! [flow-finished]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature, for development and demos. Implement
/// a custom [`Subscribe`] for structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::FlowStarted => println!("[flow-started]"),
            EventKind::FlowFinished => println!("[flow-finished]"),
            EventKind::FlowFailed => {
                println!("[flow-failed] err={:?}", e.reason);
            }
            EventKind::FlowCanceled => println!("[flow-canceled]"),
            EventKind::UnitStarting => {
                if let (Some(unit), Some(order), Some(att)) = (&e.unit, e.order, e.attempt) {
                    println!("[starting] unit={unit} order={order} attempt={att}");
                }
            }
            EventKind::UnitSucceeded => {
                println!("[succeeded] unit={:?} order={:?}", e.unit, e.order);
            }
            EventKind::UnitFailed => {
                println!(
                    "[failed] unit={:?} order={:?} err={:?} attempt={:?}",
                    e.unit, e.order, e.reason, e.attempt
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] unit={:?} order={:?} after_attempt={:?} err={:?}",
                    e.unit, e.order, e.attempt, e.reason
                );
            }
            EventKind::GateChecked => {
                println!("[gate] name={:?} verdict={:?}", e.unit, e.verdict);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] name={:?} reason={:?}", e.unit, e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] name={:?} reason={:?}", e.unit, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
