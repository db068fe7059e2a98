//! # Aggregator: race-free outcome accumulation.
//!
//! One [`Aggregator`] collects the outcomes of one batch of units. Worker
//! tasks report from whatever thread finishes first; every mutation happens
//! under the aggregator's own mutex (never shared with the flow's state
//! lock), and the batch-completion signal fires **exactly once**, through a
//! oneshot channel, so the engine never runs under the aggregator lock.
//!
//! ## Accumulate-or-finish transition
//! ```text
//! accept(order, Ok(value)):
//!   ├─ stopped?            → drop (trace log, never an error)
//!   ├─ push outcome
//!   └─ count == target?    → stop, signal Complete(outcomes)
//!
//! accept(order, Err(e)):
//!   ├─ stopped?            → drop
//!   └─ stop, signal Failed(first error, outcomes so far)
//!
//! cancel():
//!   ├─ stopped?            → no-op
//!   └─ stop, signal Canceled(outcomes so far)
//! ```
//!
//! ## Rules
//! - Whichever of {first error, cancel, Nth success} is recorded first
//!   under the lock wins; everything after is discarded.
//! - A target of 0 completes at construction, with an empty result.
//! - A target of 1 takes the same path as any other N.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{FlowError, WorkError};

/// One recorded success, tagged with the unit's submission index.
///
/// Outcomes always carry their index so either presentation order (see
/// [`present`]) can be derived after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Submission index among sibling units.
    pub order: usize,
    /// The value the unit produced.
    pub value: T,
}

/// Terminal signal for one batch.
#[derive(Debug)]
pub(crate) enum Batch<T> {
    /// Every unit reported a value.
    Complete { outcomes: Vec<Outcome<T>> },
    /// The first error short-circuited the batch.
    Failed {
        error: FlowError,
        outcomes: Vec<Outcome<T>>,
    },
    /// The caller canceled; outcomes recorded before the cancel survive.
    Canceled { outcomes: Vec<Outcome<T>> },
}

struct Inner<T> {
    outcomes: Vec<Outcome<T>>,
    target: usize,
    stopped: bool,
    done: Option<oneshot::Sender<Batch<T>>>,
}

/// Thread-safe collector of unit outcomes for one batch.
pub(crate) struct Aggregator<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Aggregator<T> {
    /// Creates an aggregator expecting `target` outcomes and returns the
    /// batch-completion receiver.
    ///
    /// A `target` of 0 fires `Complete` immediately.
    pub(crate) fn new(target: usize) -> (Arc<Self>, oneshot::Receiver<Batch<T>>) {
        let (tx, rx) = oneshot::channel();
        let mut done = Some(tx);
        let stopped = target == 0;
        if stopped {
            if let Some(tx) = done.take() {
                let _ = tx.send(Batch::Complete {
                    outcomes: Vec::new(),
                });
            }
        }
        let agg = Arc::new(Self {
            inner: Mutex::new(Inner {
                outcomes: Vec::with_capacity(target),
                target,
                stopped,
                done,
            }),
        });
        (agg, rx)
    }

    /// Records one unit's terminal report.
    ///
    /// Late reports (after an error, a cancel, or batch completion) are
    /// dropped without effect.
    pub(crate) fn accept(&self, order: usize, result: Result<T, WorkError>) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            tracing::trace!(order, "outcome arrived after stop; dropped");
            return;
        }
        match result {
            Ok(value) => {
                inner.outcomes.push(Outcome { order, value });
                if inner.outcomes.len() == inner.target {
                    inner.stopped = true;
                    let outcomes = std::mem::take(&mut inner.outcomes);
                    if let Some(tx) = inner.done.take() {
                        let _ = tx.send(Batch::Complete { outcomes });
                    }
                }
            }
            Err(source) => {
                inner.stopped = true;
                let outcomes = std::mem::take(&mut inner.outcomes);
                let error = FlowError::Work { order, source };
                if let Some(tx) = inner.done.take() {
                    let _ = tx.send(Batch::Failed { error, outcomes });
                }
            }
        }
    }

    /// Stops the batch on behalf of `cancel()`, keeping what was recorded.
    pub(crate) fn cancel(&self) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        inner.stopped = true;
        let outcomes = std::mem::take(&mut inner.outcomes);
        if let Some(tx) = inner.done.take() {
            let _ = tx.send(Batch::Canceled { outcomes });
        }
    }

    /// `true` once the batch has stopped accepting outcomes.
    pub(crate) fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }
}

impl<T: Clone> Aggregator<T> {
    /// Returns a copy of the outcomes accumulated so far.
    ///
    /// Safe to call concurrently with `accept`.
    pub(crate) fn snapshot(&self) -> Vec<Outcome<T>> {
        self.inner.lock().outcomes.clone()
    }
}

/// Applies the output-ordering policy and strips the index tags.
///
/// `ordered = true` sorts by submission index; `false` keeps insertion
/// (completion) order. Both views contain the same values.
pub(crate) fn present<T>(mut outcomes: Vec<Outcome<T>>, ordered: bool) -> Vec<T> {
    if ordered {
        outcomes.sort_by_key(|o| o.order);
    }
    outcomes.into_iter().map(|o| o.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_at_target() {
        let (agg, rx) = Aggregator::new(3);
        agg.accept(0, Ok("a"));
        agg.accept(2, Ok("c"));
        assert!(!agg.is_stopped());
        agg.accept(1, Ok("b"));
        assert!(agg.is_stopped());

        match rx.await.expect("batch signal dropped") {
            Batch::Complete { outcomes } => {
                assert_eq!(outcomes.len(), 3);
                assert_eq!(outcomes[1].order, 2);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_error_short_circuits() {
        let (agg, rx) = Aggregator::new(3);
        agg.accept(0, Ok(1));
        agg.accept(1, Err(WorkError::fail("boom")));
        // Late reports after the stop are dropped.
        agg.accept(2, Ok(3));
        agg.accept(1, Err::<i32, _>(WorkError::fail("again")));

        match rx.await.expect("batch signal dropped") {
            Batch::Failed { error, outcomes } => {
                assert_eq!(
                    error,
                    FlowError::Work {
                        order: 1,
                        source: WorkError::fail("boom")
                    }
                );
                assert_eq!(outcomes, vec![Outcome { order: 0, value: 1 }]);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_keeps_recorded_outcomes() {
        let (agg, rx) = Aggregator::new(2);
        agg.accept(1, Ok("early"));
        agg.cancel();
        agg.accept(0, Ok("late"));

        match rx.await.expect("batch signal dropped") {
            Batch::Canceled { outcomes } => {
                assert_eq!(
                    outcomes,
                    vec![Outcome {
                        order: 1,
                        value: "early"
                    }]
                );
            }
            other => panic!("expected Canceled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_target_completes_immediately() {
        let (agg, rx) = Aggregator::<()>::new(0);
        assert!(agg.is_stopped());
        match rx.await.expect("batch signal dropped") {
            Batch::Complete { outcomes } => assert!(outcomes.is_empty()),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_target_uses_general_path() {
        let (agg, rx) = Aggregator::new(1);
        agg.accept(0, Ok(99));
        match rx.await.expect("batch signal dropped") {
            Batch::Complete { outcomes } => {
                assert_eq!(outcomes, vec![Outcome { order: 0, value: 99 }])
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_copies_current_outcomes() {
        let (agg, _rx) = Aggregator::new(3);
        agg.accept(0, Ok(10));
        agg.accept(1, Ok(20));
        let snap = agg.snapshot();
        assert_eq!(snap.len(), 2);
        agg.accept(2, Ok(30));
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_present_orders_by_index() {
        let outcomes = vec![
            Outcome { order: 2, value: "c" },
            Outcome { order: 0, value: "a" },
            Outcome { order: 1, value: "b" },
        ];
        assert_eq!(present(outcomes.clone(), true), vec!["a", "b", "c"]);
        assert_eq!(present(outcomes, false), vec!["c", "a", "b"]);
    }
}
