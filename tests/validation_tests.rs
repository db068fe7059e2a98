//! Gate placement, gated loops, and validation failures.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use flowvisor::{
    forever, while_passes, Flow, FlowConfig, FlowError, FlowState, WorkError,
};

#[tokio::test]
async fn test_failing_pre_gate_finishes_empty_without_dispatch() {
    let flow = Flow::new(FlowConfig::default().with_validate_before_run(true));
    let dispatched = Arc::new(AtomicUsize::new(0));

    flow.validate_fn(|_ctx| async { Ok(false) });
    let counter = Arc::clone(&dispatched);
    flow.add_fn(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1u32)
        }
    });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Finished);
    assert_eq!(result.unwrap(), Vec::<u32>::new());
    assert_eq!(
        dispatched.load(Ordering::SeqCst),
        0,
        "units ran despite the failing pre-gate"
    );
}

#[tokio::test]
async fn test_pre_gate_loop_accumulates_batches() {
    // Gate passes twice, then stops the loop.
    let checks_left = Arc::new(AtomicU32::new(2));
    let iteration = Arc::new(AtomicU32::new(0));

    let gate_state = Arc::clone(&checks_left);
    let work_state = Arc::clone(&iteration);
    let flow = while_passes(
        move |_ctx| {
            let gate_state = Arc::clone(&gate_state);
            async move { Ok(gate_state.fetch_sub(1, Ordering::SeqCst) > 0) }
        },
        move |_ctx| {
            let work_state = Arc::clone(&work_state);
            async move { Ok::<_, WorkError>(work_state.fetch_add(1, Ordering::SeqCst)) }
        },
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Finished);
    assert_eq!(result.unwrap(), vec![0, 1]);
    assert_eq!(iteration.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_post_gate_runs_batch_before_first_check() {
    // Do-while: the gate stops on the very first check, after one batch.
    let flow = Flow::new(FlowConfig::default().with_ordered_output(true));
    flow.validate_fn(|_ctx| async { Ok(false) });
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>("ran once") });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Finished);
    assert_eq!(result.unwrap(), vec!["ran once"]);
}

#[tokio::test]
async fn test_inverted_expectation_loops_while_gate_reports_false() {
    // expected_validation = false: the loop continues on `false` verdicts.
    let verdicts = Arc::new(AtomicBool::new(false));
    let flow = Flow::new(
        FlowConfig::default()
            .with_expected_validation(false)
            .with_ordered_output(true),
    );
    let gate_state = Arc::clone(&verdicts);
    flow.validate_fn(move |_ctx| {
        let gate_state = Arc::clone(&gate_state);
        async move { Ok(gate_state.swap(true, Ordering::SeqCst)) }
    });
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>(1u32) });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Finished);
    // First check: false == expected → second batch; second check: true → stop.
    assert_eq!(result.unwrap(), vec![1, 1]);
}

#[tokio::test]
async fn test_gate_error_fails_the_flow() {
    let flow = Flow::new(FlowConfig::default().with_validate_before_run(true));
    flow.validate_fn(|_ctx| async { Err::<bool, _>(WorkError::fail("gate broke")) });
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>(1u32) });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_error(move |error| {
        let _ = tx.send(error);
    });
    flow.start();

    let error = rx.await.expect("error handler never fired");
    assert_eq!(
        error,
        FlowError::Validation {
            source: WorkError::fail("gate broke"),
        }
    );
    assert_eq!(flow.state(), FlowState::Failed);
}

#[tokio::test]
async fn test_panicking_gate_fails_the_flow() {
    let flow = Flow::new(FlowConfig::default().with_validate_before_run(true));
    flow.validate_fn(|_ctx| async { panic!("gate exploded") });
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>(1u32) });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_error(move |error| {
        let _ = tx.send(error);
    });
    flow.start();

    let error = rx.await.expect("error handler never fired");
    assert_eq!(
        error,
        FlowError::Validation {
            source: WorkError::fatal("gate exploded"),
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_forever_runs_until_canceled() {
    let executed = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&executed);
    let flow = forever(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move { Ok::<_, WorkError>(counter.fetch_add(1, Ordering::SeqCst)) }
    });
    flow.start();

    // Wait until a few iterations have run.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while executed.load(Ordering::SeqCst) < 5 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "loop never got going"
        );
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    // cancel() only lands in Running; the loop alternates Running/Testing.
    let canceled_at = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while !flow.state().is_terminal() {
        flow.cancel();
        assert!(
            tokio::time::Instant::now() < canceled_at,
            "cancel never took effect"
        );
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    assert_eq!(flow.state(), FlowState::Canceled);
    assert!(executed.load(Ordering::SeqCst) >= 5);
}
