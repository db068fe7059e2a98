//! # Flow: the public handle over one composed unit-of-work lifecycle.
//!
//! A [`Flow`] is configured while `Queued` (fluent methods below), then
//! driven to exactly one terminal state by [`start`](Flow::start) /
//! [`run`](Flow::run). Configuration after start, a second `start()`, or a
//! `cancel()` outside `Running` are rejected as logged no-ops — never
//! errors, never panics.
//!
//! ## Example
//! ```
//! use flowvisor::{Flow, FlowConfig, FlowState, WorkError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let flow = Flow::new(FlowConfig::default().with_concurrency(2).with_ordered_output(true));
//!     for i in 0..5usize {
//!         flow.add_fn(move |_ctx| async move { Ok::<_, WorkError>(i) });
//!     }
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     flow.on_finish(move |state, result| {
//!         let _ = tx.send((state, result));
//!     });
//!     flow.start();
//!
//!     let (state, result) = rx.await.unwrap();
//!     assert_eq!(state, FlowState::Finished);
//!     assert_eq!(result.unwrap(), vec![0, 1, 2, 3, 4]);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::config::FlowConfig;
use crate::engine::aggregate::{Aggregator, Outcome};
use crate::engine::drive;
use crate::error::{FlowError, WorkError};
use crate::events::{Bus, Event};
use crate::executor::Executor;
use crate::notify::Notifier;
use crate::state::{FlowResult, FlowState};
use crate::subscribers::Subscribe;
use crate::work::{GateFn, GateRef, WorkFn, WorkRef};

/// Handler invoked with the terminal state and the discriminated result.
pub(crate) type FinishHandler<T> = Box<dyn FnOnce(FlowState, FlowResult<T>) + Send + 'static>;
/// Handler invoked with the terminal error.
pub(crate) type ErrorHandler = Box<dyn FnOnce(FlowError) + Send + 'static>;
/// Handler invoked on cancellation.
pub(crate) type CancelHandler = Box<dyn FnOnce() + Send + 'static>;

/// Mutable pre-start configuration, consumed by `start()`.
pub(crate) struct Setup<T> {
    pub(crate) units: Vec<WorkRef<T>>,
    pub(crate) gate: Option<GateRef>,
    pub(crate) on_finish: Option<FinishHandler<T>>,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) on_cancel: Option<CancelHandler>,
    pub(crate) notifier: Option<Notifier>,
    pub(crate) executor: Option<Executor>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
}

/// State shared between the handle, the drive task, and worker tasks.
pub(crate) struct Shared<T> {
    pub(crate) config: FlowConfig,
    /// Lifecycle state. Its own lock; never shared with an aggregator's.
    state: Mutex<FlowState>,
    /// Mirrors `state` for awaiting terminal transitions.
    state_tx: watch::Sender<FlowState>,
    /// Pre-start configuration; `None` once the flow has started.
    pub(crate) setup: Mutex<Option<Setup<T>>>,
    /// The live batch, reachable by `cancel()` and `snapshot()`.
    pub(crate) batch: Mutex<Option<Arc<Aggregator<T>>>>,
    /// Outcomes accumulated across completed batches.
    pub(crate) collected: Mutex<Vec<Outcome<T>>>,
    /// Flow-wide cancellation root; every unit gets a child token.
    pub(crate) token: CancellationToken,
    pub(crate) bus: Bus,
}

impl<T> Shared<T> {
    /// Records a state transition. Terminal states are sticky: a transition
    /// attempted after one is rejected.
    pub(crate) fn set_state(&self, next: FlowState) {
        let mut state = self.state.lock();
        let prev = *state;
        if prev.is_terminal() {
            tracing::warn!(
                from = prev.as_label(),
                to = next.as_label(),
                "transition after terminal state rejected"
            );
            return;
        }
        *state = next;
        drop(state);
        tracing::trace!(from = prev.as_label(), to = next.as_label(), "flow state");
        let _ = self.state_tx.send(next);
    }

    pub(crate) fn state(&self) -> FlowState {
        *self.state.lock()
    }
}

/// One composed unit-of-work lifecycle.
///
/// Cheap to clone; every clone is the same flow, so one task can `start()`
/// while another holds a clone just to `cancel()` or `join()`.
pub struct Flow<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Flow<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Flow<T> {
    /// Creates a queued flow with the given configuration.
    pub fn new(config: FlowConfig) -> Self {
        let (state_tx, _state_rx) = watch::channel(FlowState::Queued);
        let bus = Bus::new(config.bus_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(FlowState::Queued),
                state_tx,
                setup: Mutex::new(Some(Setup {
                    units: Vec::new(),
                    gate: None,
                    on_finish: None,
                    on_error: None,
                    on_cancel: None,
                    notifier: None,
                    executor: None,
                    subscribers: Vec::new(),
                })),
                batch: Mutex::new(None),
                collected: Mutex::new(Vec::new()),
                token: CancellationToken::new(),
                bus,
            }),
        }
    }

    /// Applies `mutate` to the pre-start setup, or logs the rejected call
    /// if the flow has already started.
    fn configure(&self, method: &'static str, mutate: impl FnOnce(&mut Setup<T>)) -> &Self {
        let mut setup = self.shared.setup.lock();
        match setup.as_mut() {
            Some(setup) => mutate(setup),
            None => tracing::warn!(method, "configuration after start ignored"),
        }
        self
    }

    /// Appends one work unit.
    pub fn add_work(&self, unit: WorkRef<T>) -> &Self {
        self.configure("add_work", |setup| setup.units.push(unit))
    }

    /// Appends one work unit from a closure.
    ///
    /// The closure runs once per attempt and may run again under the
    /// flow's retry budget.
    pub fn add_fn<F, Fut>(&self, f: F) -> &Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.configure("add_fn", |setup| {
            let name = format!("unit-{}", setup.units.len());
            setup.units.push(WorkFn::arc(name, f));
        })
    }

    /// Appends a batch of work units.
    pub fn add_batch(&self, units: impl IntoIterator<Item = WorkRef<T>>) -> &Self {
        self.configure("add_batch", |setup| setup.units.extend(units))
    }

    /// Installs the validation gate (replacing any previous one).
    pub fn validate_with(&self, gate: GateRef) -> &Self {
        self.configure("validate_with", |setup| setup.gate = Some(gate))
    }

    /// Installs a validation gate from a closure.
    pub fn validate_fn<F, Fut>(&self, f: F) -> &Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, WorkError>> + Send + 'static,
    {
        self.configure("validate_fn", |setup| {
            setup.gate = Some(GateFn::arc("gate", f));
        })
    }

    /// Registers the finish handler: `(terminal state, result)`.
    ///
    /// Fires for `Finished`, and as the fallback for `Failed` / `Canceled`
    /// when no dedicated handler is registered.
    pub fn on_finish<F>(&self, handler: F) -> &Self
    where
        F: FnOnce(FlowState, FlowResult<T>) + Send + 'static,
    {
        self.configure("on_finish", |setup| {
            setup.on_finish = Some(Box::new(handler));
        })
    }

    /// Registers the error handler, invoked with the terminal error.
    pub fn on_error<F>(&self, handler: F) -> &Self
    where
        F: FnOnce(FlowError) + Send + 'static,
    {
        self.configure("on_error", |setup| {
            setup.on_error = Some(Box::new(handler));
        })
    }

    /// Registers the cancel handler.
    pub fn on_cancel<F>(&self, handler: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.configure("on_cancel", |setup| {
            setup.on_cancel = Some(Box::new(handler));
        })
    }

    /// Routes callbacks onto the given notification context instead of a
    /// private one.
    pub fn with_notifier(&self, notifier: Notifier) -> &Self {
        self.configure("with_notifier", |setup| setup.notifier = Some(notifier))
    }

    /// Shares an executor (and thus its concurrency permits) with other
    /// flows, overriding the one built from this flow's config.
    pub fn with_executor(&self, executor: Executor) -> &Self {
        self.configure("with_executor", |setup| setup.executor = Some(executor))
    }

    /// Attaches a lifecycle-event subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscribe>) -> &Self {
        self.configure("subscribe", |setup| setup.subscribers.push(subscriber))
    }

    /// Starts the flow.
    ///
    /// Must be called within a tokio runtime. A second call (or a call on
    /// a flow that already ran) is a logged no-op.
    pub fn start(&self) {
        let taken = self.shared.setup.lock().take();
        let Some(setup) = taken else {
            tracing::warn!("start ignored: flow already started");
            return;
        };
        tokio::spawn(drive::drive(Arc::clone(&self.shared), setup));
    }

    /// Requests cancellation.
    ///
    /// A no-op unless the flow is `Running`. Pending units never start;
    /// in-flight units are interrupted cooperatively via their token, and
    /// any value they report afterwards is discarded.
    pub fn cancel(&self) {
        let state = self.shared.state();
        if state != FlowState::Running {
            tracing::warn!(state = state.as_label(), "cancel ignored: flow not running");
            return;
        }
        self.shared.token.cancel();
        let batch = self.shared.batch.lock().clone();
        if let Some(agg) = batch {
            agg.cancel();
        }
    }

    /// Waits until the flow reaches a terminal state and returns it.
    ///
    /// Never resolves for a flow that is never started.
    pub async fn join(&self) -> FlowState {
        let mut rx = self.shared.state_tx.subscribe();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            // The sender lives in `Shared`, so this arm is unreachable
            // while any handle exists; fall back to the lock if not.
            Err(_) => self.shared.state(),
        };
        state
    }

    /// Starts the flow and waits for its terminal state.
    ///
    /// Results are still delivered through the registered handlers, on the
    /// notification context.
    pub async fn run(&self) -> FlowState {
        self.start();
        self.join().await
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> FlowState {
        self.shared.state()
    }

    /// Returns a receiver observing this flow's lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl<T: Clone + Send + 'static> Flow<T> {
    /// Returns the values recorded so far, in completion order.
    ///
    /// Safe to call from any thread while the flow runs.
    pub fn snapshot(&self) -> Vec<T> {
        let mut outcomes = self.shared.collected.lock().clone();
        let batch = self.shared.batch.lock().clone();
        if let Some(agg) = batch {
            outcomes.extend(agg.snapshot());
        }
        outcomes.into_iter().map(|o| o.value).collect()
    }
}
