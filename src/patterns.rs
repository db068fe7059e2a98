//! # Named flow patterns.
//!
//! Thin builders that reshape the generic [`Flow`] API into the common
//! control-flow shapes. Each returns a configured, still-`Queued` flow —
//! callbacks can be registered and the configuration adjusted further
//! before `start()`.
//!
//! | Pattern | Shape |
//! |---|---|
//! | [`sequence`] | strictly serial chain, index-ordered output |
//! | [`fan_out`]  | bounded-parallel batch |
//! | [`chain`]    | waterfall: each step receives the previous step's value |
//! | [`repeat`]   | run one closure N times (iteration index passed in) |
//! | [`while_passes`] | test the condition, then run one batch, repeatedly |
//! | [`forever`]  | run repeatedly until canceled or an error occurs |

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::FlowConfig;
use crate::engine::Flow;
use crate::error::WorkError;
use crate::work::{GateFn, WorkFn, WorkRef};

/// Strictly serial chain: concurrency 1, index-ordered output.
pub fn sequence<T: Send + 'static>(units: impl IntoIterator<Item = WorkRef<T>>) -> Flow<T> {
    let flow = Flow::new(
        FlowConfig::default()
            .with_concurrency(1)
            .with_ordered_output(true),
    );
    flow.add_batch(units);
    flow
}

/// Bounded-parallel batch (`limit = 0` runs everything at once).
pub fn fan_out<T: Send + 'static>(
    units: impl IntoIterator<Item = WorkRef<T>>,
    limit: usize,
) -> Flow<T> {
    let flow = Flow::new(FlowConfig::default().with_concurrency(limit));
    flow.add_batch(units);
    flow
}

/// Waterfall: each step receives the previous step's value (`None` for the
/// first step), runs serially, and the result carries every step's value in
/// step order.
pub fn chain<T, F, Fut>(steps: impl IntoIterator<Item = F>) -> Flow<T>
where
    T: Clone + Send + 'static,
    F: Fn(Option<T>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    let flow = Flow::new(
        FlowConfig::default()
            .with_concurrency(1)
            .with_ordered_output(true),
    );
    let carry: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
    for (index, step) in steps.into_iter().enumerate() {
        let carry = Arc::clone(&carry);
        let step = Arc::new(step);
        flow.add_work(WorkFn::arc(format!("step-{index}"), move |ctx| {
            let carry = Arc::clone(&carry);
            let step = Arc::clone(&step);
            async move {
                let prev = carry.lock().clone();
                let value = (*step)(prev, ctx).await?;
                *carry.lock() = Some(value.clone());
                Ok(value)
            }
        }));
    }
    flow
}

/// Runs one closure `times` times as sibling units, passing the iteration
/// index; output is index-ordered.
pub fn repeat<T, F, Fut>(times: usize, f: F) -> Flow<T>
where
    T: Send + 'static,
    F: Fn(usize, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    let flow = Flow::new(FlowConfig::default().with_ordered_output(true));
    let f = Arc::new(f);
    for i in 0..times {
        let f = Arc::clone(&f);
        flow.add_work(WorkFn::arc(format!("iteration-{i}"), move |ctx| {
            (*f)(i, ctx)
        }));
    }
    flow
}

/// While-style loop: evaluate `condition` before each pass of `work`; a
/// `false` verdict stops the loop with everything accumulated so far (an
/// immediate `false` finishes empty, without running `work` at all).
pub fn while_passes<T, C, CFut, W, WFut>(condition: C, work: W) -> Flow<T>
where
    T: Send + 'static,
    C: Fn(CancellationToken) -> CFut + Send + Sync + 'static,
    CFut: Future<Output = Result<bool, WorkError>> + Send + 'static,
    W: Fn(CancellationToken) -> WFut + Send + Sync + 'static,
    WFut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    let flow = Flow::new(
        FlowConfig::default()
            .with_validate_before_run(true)
            .with_ordered_output(true),
    );
    flow.validate_with(GateFn::arc("while-condition", condition));
    flow.add_fn(work);
    flow
}

/// Runs `work` repeatedly until the flow is canceled or an error occurs.
pub fn forever<T, W, WFut>(work: W) -> Flow<T>
where
    T: Send + 'static,
    W: Fn(CancellationToken) -> WFut + Send + Sync + 'static,
    WFut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    let flow = Flow::new(FlowConfig::default());
    flow.validate_fn(|_ctx| async { Ok(true) });
    flow.add_fn(work);
    flow
}
