//! A while-style gated loop with the built-in log subscriber.
//!
//! Run with: `cargo run --example validated_loop --features logging`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use flowvisor::{while_passes, FlowState, LogWriter, WorkError};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let budget = Arc::new(AtomicU32::new(4));
    let produced = Arc::new(AtomicU32::new(0));

    let gate_budget = Arc::clone(&budget);
    let counter = Arc::clone(&produced);
    let flow = while_passes(
        move |_ctx| {
            let gate_budget = Arc::clone(&gate_budget);
            async move { Ok(gate_budget.fetch_sub(1, Ordering::SeqCst) > 0) }
        },
        move |_ctx| {
            let counter = Arc::clone(&counter);
            async move { Ok::<_, WorkError>(counter.fetch_add(1, Ordering::SeqCst)) }
        },
    );
    flow.subscribe(Arc::new(LogWriter));

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("flow dropped its finish handler");
    assert_eq!(state, FlowState::Finished);
    println!("iterations: {:?}", result.expect("flow failed"));
}
