//! # The lifecycle drive loop.
//!
//! One task per flow owns every state transition and the terminal report.
//! Worker tasks never touch `FlowState`; they only talk to the aggregator,
//! and the drive loop reacts to the aggregator's batch signal. That keeps
//! the at-most-one-terminal-transition invariant local to a single task.
//!
//! ## Loop shape
//! ```text
//! [pre-gate?] ──► Running: dispatch batch ──► await batch signal
//!      │                                         ├─ Complete  → collect
//!      │                                         ├─ Failed    → Failed
//!      │                                         └─ Canceled  → Canceled
//!      │
//!      ├─ verdict != expected → Finished (accumulated partials)
//!      └─ gate error          → Failed
//!
//! no gate        → one batch, then Finished
//! gate + before  → test, run, test, run, ...   (while-style)
//! gate + after   → run, test, run, test, ...   (do-while-style)
//! ```
//!
//! ## Rules
//! - The terminal callback fires **after** every outcome that will ever be
//!   counted is durably recorded; anything arriving later is dropped.
//! - At most one of {finish, error, cancel} fires, on the notifier context.
//! - When no dedicated error/cancel handler is registered, the finish
//!   handler receives the terminal state instead — the caller is never
//!   left without notification.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::engine::aggregate::{present, Aggregator, Batch};
use crate::engine::flow::{Setup, Shared};
use crate::error::{panic_reason, FlowError, WorkError};
use crate::events::{Event, EventKind};
use crate::executor::Executor;
use crate::notify::Notifier;
use crate::state::FlowState;
use crate::subscribers::SubscriberSet;
use crate::work::GateRef;

/// Terminal disposition of a flow.
enum Terminal<T> {
    Finished { values: Vec<T> },
    Canceled { values: Vec<T> },
    Failed { error: FlowError },
}

/// Outcome of one gate evaluation.
enum Verdict {
    /// Verdict matched the expectation; the loop continues.
    Proceed,
    /// Verdict mismatched; the loop stops with what has accumulated.
    Stop,
    /// The gate errored; the flow fails.
    Error(FlowError),
    /// The gate observed the flow-wide cancel; cancellation wins over the
    /// gate's report.
    Canceled,
}

/// Drives one flow from `Queued` to its terminal state.
pub(crate) async fn drive<T: Send + 'static>(shared: Arc<Shared<T>>, setup: Setup<T>) {
    let Setup {
        units,
        gate,
        on_finish,
        on_error,
        on_cancel,
        notifier,
        executor,
        subscribers,
    } = setup;

    let notifier = notifier.unwrap_or_else(Notifier::spawn);
    let executor = executor
        .unwrap_or_else(|| Executor::new(shared.config.concurrency, shared.config.priority));
    if !subscribers.is_empty() {
        SubscriberSet::listen(&shared.bus, subscribers);
    }
    shared.bus.publish(Event::new(EventKind::FlowStarted));

    let mut next_order: usize = 0;

    let terminal: Terminal<T> = loop {
        // While-style loops test before dispatching anything; a first-check
        // mismatch finishes with an empty result and no unit ever starts.
        if let Some(gate) = gate.as_ref().filter(|_| shared.config.validate_before_run) {
            match run_gate(&shared, gate).await {
                Verdict::Proceed => {}
                Verdict::Stop => break Terminal::finished(&shared),
                Verdict::Error(error) => break Terminal::Failed { error },
                Verdict::Canceled => break Terminal::canceled(&shared),
            }
        }

        shared.set_state(FlowState::Running);

        let batch: Vec<_> = units
            .iter()
            .map(Arc::clone)
            .enumerate()
            .map(|(i, unit)| (next_order + i, unit))
            .collect();
        let (agg, signal) = Aggregator::new(batch.len());
        *shared.batch.lock() = Some(Arc::clone(&agg));
        // cancel() may have fired between the state change and the batch
        // slot being filled; the token records it either way.
        if shared.token.is_cancelled() {
            agg.cancel();
        }
        if !batch.is_empty() {
            executor.dispatch(
                batch,
                shared.config.retry_limit,
                shared.token.clone(),
                Arc::clone(&agg),
                shared.bus.clone(),
            );
        }

        let outcome = match signal.await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!("batch signal dropped; treating as canceled");
                Batch::Canceled {
                    outcomes: Vec::new(),
                }
            }
        };
        *shared.batch.lock() = None;

        match outcome {
            Batch::Complete { outcomes } => {
                next_order += units.len();
                shared.collected.lock().extend(outcomes);
            }
            Batch::Failed { error, .. } => {
                shared.token.cancel();
                break Terminal::Failed { error };
            }
            Batch::Canceled { outcomes } => {
                shared.collected.lock().extend(outcomes);
                break Terminal::canceled(&shared);
            }
        }

        // A cancel that landed after the batch signal still wins before the
        // next iteration begins.
        if shared.token.is_cancelled() {
            break Terminal::canceled(&shared);
        }

        match gate.as_ref() {
            None => break Terminal::finished(&shared),
            Some(gate) if !shared.config.validate_before_run => {
                match run_gate(&shared, gate).await {
                    Verdict::Proceed => {}
                    Verdict::Stop => break Terminal::finished(&shared),
                    Verdict::Error(error) => break Terminal::Failed { error },
                    Verdict::Canceled => break Terminal::canceled(&shared),
                }
            }
            Some(_) => {}
        }
    };

    // Publish before the state flips so anyone woken by the terminal state
    // already finds the event on the bus.
    shared.bus.publish(terminal.event());
    shared.set_state(terminal.state());
    deliver(&notifier, terminal, on_finish, on_error, on_cancel);
}

/// Evaluates the gate once, in `Testing`, and classifies the verdict.
async fn run_gate<T>(shared: &Shared<T>, gate: &GateRef) -> Verdict {
    shared.set_state(FlowState::Testing);

    let res = AssertUnwindSafe(gate.check(shared.token.child_token()))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(WorkError::fatal(panic_reason(panic.as_ref()))));

    match res {
        Ok(verdict) => {
            shared.bus.publish(
                Event::new(EventKind::GateChecked)
                    .with_unit(gate.name())
                    .with_verdict(verdict),
            );
            if verdict == shared.config.expected_validation {
                Verdict::Proceed
            } else {
                Verdict::Stop
            }
        }
        Err(source) => {
            shared.bus.publish(
                Event::new(EventKind::GateChecked)
                    .with_unit(gate.name())
                    .with_reason(source.to_string()),
            );
            if source == WorkError::Canceled && shared.token.is_cancelled() {
                return Verdict::Canceled;
            }
            Verdict::Error(FlowError::Validation { source })
        }
    }
}

impl<T> Terminal<T> {
    /// Closes out a successful flow with everything collected so far,
    /// presented per the configured ordering policy.
    fn finished(shared: &Shared<T>) -> Self {
        let outcomes = std::mem::take(&mut *shared.collected.lock());
        Terminal::Finished {
            values: present(outcomes, shared.config.ordered_output),
        }
    }

    /// Closes out a canceled flow, keeping outcomes recorded pre-cancel.
    fn canceled(shared: &Shared<T>) -> Self {
        let outcomes = std::mem::take(&mut *shared.collected.lock());
        Terminal::Canceled {
            values: present(outcomes, shared.config.ordered_output),
        }
    }

    fn state(&self) -> FlowState {
        match self {
            Terminal::Finished { .. } => FlowState::Finished,
            Terminal::Canceled { .. } => FlowState::Canceled,
            Terminal::Failed { .. } => FlowState::Failed,
        }
    }

    fn event(&self) -> Event {
        match self {
            Terminal::Finished { .. } => Event::new(EventKind::FlowFinished),
            Terminal::Canceled { .. } => Event::new(EventKind::FlowCanceled),
            Terminal::Failed { error } => {
                Event::new(EventKind::FlowFailed).with_reason(error.to_string())
            }
        }
    }
}

/// Fires exactly one terminal callback on the notifier context.
fn deliver<T: Send + 'static>(
    notifier: &Notifier,
    terminal: Terminal<T>,
    on_finish: Option<crate::engine::flow::FinishHandler<T>>,
    on_error: Option<crate::engine::flow::ErrorHandler>,
    on_cancel: Option<crate::engine::flow::CancelHandler>,
) {
    match terminal {
        Terminal::Finished { values } => {
            if let Some(finish) = on_finish {
                notifier.post(Box::new(move || finish(FlowState::Finished, Ok(values))));
            }
        }
        Terminal::Canceled { values } => {
            if let Some(cancel) = on_cancel {
                notifier.post(Box::new(move || cancel()));
            } else if let Some(finish) = on_finish {
                notifier.post(Box::new(move || finish(FlowState::Canceled, Ok(values))));
            }
        }
        Terminal::Failed { error } => {
            if let Some(err) = on_error {
                notifier.post(Box::new(move || err(error)));
            } else if let Some(finish) = on_finish {
                notifier.post(Box::new(move || finish(FlowState::Failed, Err(error))));
            }
        }
    }
}
