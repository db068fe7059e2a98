//! # Run one unit to its terminal report.
//!
//! Executes a [`Work`] unit's attempt loop: run the closure, consult the
//! retry budget on failure, and report **at most one** outcome to the
//! aggregator.
//!
//! ## Attempt loop
//! ```text
//! loop {
//!   ├─► token cancelled before the attempt? → exit, no outcome at all
//!   ├─► publish UnitStarting
//!   ├─► run closure (panics caught → Fatal)
//!   │       ├─ Ok(value)            → publish UnitSucceeded, report, exit
//!   │       ├─ Err(Canceled)        → exit, no outcome (graceful)
//!   │       ├─ Err(retryable) + budget → publish RetryScheduled, loop
//!   │       └─ Err(other)           → publish UnitFailed, report, exit
//! }
//! ```
//!
//! ## Rules
//! - Retries re-run the same closure **in place**, under the same permit
//!   and the same submission index, so a retried unit never double-counts
//!   against the batch target.
//! - A unit canceled before its first attempt is simply absent from the
//!   results — not an error.
//! - A panicking closure surfaces as [`WorkError::Fatal`], never a crashed
//!   worker task.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

use crate::engine::aggregate::Aggregator;
use crate::error::{panic_reason, WorkError};
use crate::events::{Bus, Event, EventKind};
use crate::work::WorkRef;

/// Runs one unit until it produces its terminal report (or exits silently
/// on cancellation). Holds `_permit` for its whole life so the concurrency
/// cap counts retries as the same slot.
pub(crate) async fn run_unit<T: Send + 'static>(
    unit: WorkRef<T>,
    order: usize,
    retry_limit: u32,
    token: CancellationToken,
    agg: Arc<Aggregator<T>>,
    bus: Bus,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let mut remaining = retry_limit;
    let mut attempt: u32 = 1;

    loop {
        if token.is_cancelled() {
            tracing::trace!(order, unit = unit.name(), "canceled before attempt");
            return;
        }

        bus.publish(
            Event::new(EventKind::UnitStarting)
                .with_unit(unit.name())
                .with_order(order)
                .with_attempt(attempt),
        );

        let res = AssertUnwindSafe(unit.run(token.child_token()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(WorkError::fatal(panic_reason(panic.as_ref())))
            });

        match res {
            Ok(value) => {
                bus.publish(
                    Event::new(EventKind::UnitSucceeded)
                        .with_unit(unit.name())
                        .with_order(order)
                        .with_attempt(attempt),
                );
                agg.accept(order, Ok(value));
                return;
            }
            Err(WorkError::Canceled) => {
                // Graceful exit: the unit saw the token; it has no outcome.
                tracing::trace!(order, unit = unit.name(), "unit exited on cancellation");
                return;
            }
            Err(e) if e.is_retryable() && remaining > 0 => {
                remaining -= 1;
                bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_unit(unit.name())
                        .with_order(order)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                attempt += 1;
            }
            Err(e) => {
                bus.publish(
                    Event::new(EventKind::UnitFailed)
                        .with_unit(unit.name())
                        .with_order(order)
                        .with_attempt(attempt)
                        .with_reason(e.to_string()),
                );
                agg.accept(order, Err(e));
                return;
            }
        }
    }
}
