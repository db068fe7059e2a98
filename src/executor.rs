//! # Executor: permit-gated dispatch of unit runners.
//!
//! The [`Executor`] turns a batch of work units into spawned runner tasks,
//! bounded by an optional [`Semaphore`]. The dispatcher acquires each permit
//! **before** spawning the next runner, which gives two guarantees the
//! engine relies on:
//!
//! - units *start* in submission order for any cap, and
//! - a cap of 1 is strictly serial: unit `i + 1` cannot start until unit
//!   `i` has released its permit.
//!
//! ## Dispatch loop
//! ```text
//! for (order, unit) in batch {
//!   ├─► acquire permit (cancellable wait)
//!   ├─► stop if the batch already short-circuited or the flow was canceled
//!   └─► spawn runner(unit, order, permit)   (permit held for the runner's
//! }                                          whole life, retries included)
//! ```
//!
//! An executor is cheap to clone and safe to share between flows: the
//! semaphore is the only state, so concurrently dispatching flows simply
//! compete for the same permits.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::engine::aggregate::Aggregator;
use crate::engine::runner;
use crate::events::Bus;
use crate::work::WorkRef;

/// Quality-of-service hint attached to dispatched work.
///
/// The tokio runtime has no priority lanes, so the hint is carried through
/// to tracing spans and events for operators; a custom executor wrapper can
/// map it onto separate runtimes or semaphores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Latency-sensitive work.
    High,
    /// The default class.
    #[default]
    Normal,
    /// Throughput work that may yield to others.
    Low,
    /// Maintenance work.
    Background,
}

impl Priority {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Background => "background",
        }
    }
}

/// Bounded-concurrency submission surface over the tokio runtime.
#[derive(Clone)]
pub struct Executor {
    semaphore: Option<Arc<Semaphore>>,
    priority: Priority,
}

impl Executor {
    /// Creates an executor with the given cap (0 = unbounded) and priority
    /// hint.
    pub fn new(concurrency: usize, priority: Priority) -> Self {
        let semaphore = match concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        Self {
            semaphore,
            priority,
        }
    }

    /// Dispatches one batch of unit runners.
    ///
    /// Returns immediately; the dispatch loop runs as its own task so a
    /// saturated semaphore never blocks the engine. Dispatch stops early
    /// when `token` is cancelled or `agg` has already stopped accepting
    /// outcomes — pending units are then guaranteed never to start.
    pub(crate) fn dispatch<T: Send + 'static>(
        &self,
        batch: Vec<(usize, WorkRef<T>)>,
        retry_limit: u32,
        token: CancellationToken,
        agg: Arc<Aggregator<T>>,
        bus: Bus,
    ) {
        let semaphore = self.semaphore.clone();
        let priority = self.priority;
        tokio::spawn(async move {
            for (order, unit) in batch {
                let permit = match &semaphore {
                    Some(sem) => {
                        tokio::select! {
                            res = sem.clone().acquire_owned() => match res {
                                Ok(permit) => Some(permit),
                                Err(_closed) => break,
                            },
                            _ = token.cancelled() => break,
                        }
                    }
                    None => None,
                };
                if agg.is_stopped() {
                    break;
                }
                tracing::trace!(
                    order,
                    unit = unit.name(),
                    priority = priority.as_label(),
                    "dispatching unit"
                );
                tokio::spawn(runner::run_unit(
                    unit,
                    order,
                    retry_limit,
                    token.child_token(),
                    Arc::clone(&agg),
                    bus.clone(),
                    permit,
                ));
            }
        });
    }
}
