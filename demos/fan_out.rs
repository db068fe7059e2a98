//! Bounded fan-out over a batch of simulated downloads.
//!
//! Run with: `cargo run --example fan_out`

use std::time::Duration;

use flowvisor::{Flow, FlowConfig, FlowState, WorkError};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let flow = Flow::new(
        FlowConfig::default()
            .with_concurrency(3)
            .with_ordered_output(true)
            .with_retry_limit(1),
    );

    for i in 0..8u64 {
        flow.add_fn(move |ctx| async move {
            if ctx.is_cancelled() {
                return Err(WorkError::Canceled);
            }
            // Simulate a download whose duration depends on the item.
            tokio::time::sleep(Duration::from_millis(20 * (8 - i))).await;
            Ok(i * 100)
        });
    }

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("flow dropped its finish handler");
    assert_eq!(state, FlowState::Finished);
    println!("downloaded: {:?}", result.expect("flow failed"));
}
