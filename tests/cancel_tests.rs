//! Cancellation semantics: late results are discarded, pending units never
//! start, and exactly one terminal callback fires no matter who races.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowvisor::{Flow, FlowConfig, FlowState, WorkError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_discards_late_results() {
    let started = Arc::new(tokio::sync::Notify::new());
    let release = Arc::new(tokio::sync::Notify::new());

    let flow = Flow::new(FlowConfig::default());
    let started_tx = Arc::clone(&started);
    let release_rx = Arc::clone(&release);
    // Ignores its token on purpose: completes only when released.
    flow.add_fn(move |_ctx| {
        let started_tx = Arc::clone(&started_tx);
        let release_rx = Arc::clone(&release_rx);
        async move {
            started_tx.notify_one();
            release_rx.notified().await;
            Ok::<_, WorkError>(42u32)
        }
    });

    let canceled = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&canceled);
    flow.on_cancel(move || {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    flow.start();

    started.notified().await;
    flow.cancel();
    assert_eq!(flow.join().await, FlowState::Canceled);

    // Let the stubborn unit finish now; its value must change nothing.
    release.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(flow.state(), FlowState::Canceled);
    assert_eq!(flow.snapshot(), Vec::<u32>::new());
    assert_eq!(canceled.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_keeps_outcomes_recorded_before_it() {
    let first_done = Arc::new(tokio::sync::Notify::new());
    let flow = Flow::new(FlowConfig::default());

    let done_tx = Arc::clone(&first_done);
    flow.add_fn(move |_ctx| {
        let done_tx = Arc::clone(&done_tx);
        async move {
            done_tx.notify_one();
            Ok::<_, WorkError>("early")
        }
    });
    flow.add_fn(|ctx| async move {
        ctx.cancelled().await;
        Err(WorkError::Canceled)
    });

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    first_done.notified().await;
    // The first outcome may still be in flight to the aggregator.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while flow.snapshot().is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "first outcome never recorded"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    flow.cancel();

    // No dedicated cancel handler: the finish handler reports Canceled with
    // the partial result.
    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Canceled);
    assert_eq!(result.unwrap(), vec!["early"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pending_units_never_start_after_cancel() {
    let started = Arc::new(tokio::sync::Notify::new());
    let second_ran = Arc::new(AtomicBool::new(false));

    let flow = Flow::new(FlowConfig::default().with_concurrency(1));
    let started_tx = Arc::clone(&started);
    flow.add_fn(move |ctx| {
        let started_tx = Arc::clone(&started_tx);
        async move {
            started_tx.notify_one();
            ctx.cancelled().await;
            Err(WorkError::Canceled)
        }
    });
    let ran = Arc::clone(&second_ran);
    flow.add_fn(move |_ctx| {
        let ran = Arc::clone(&ran);
        async move {
            ran.store(true, Ordering::SeqCst);
            Ok(1u32)
        }
    });
    flow.start();

    started.notified().await;
    flow.cancel();
    assert_eq!(flow.join().await, FlowState::Canceled);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        !second_ran.load(Ordering::SeqCst),
        "pending unit started after cancel"
    );
}

#[tokio::test]
async fn test_cancel_before_start_is_a_noop() {
    let flow = Flow::new(FlowConfig::default());
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>(7u32) });
    // Still Queued: must not affect the later run.
    flow.cancel();

    let (tx, rx) = tokio::sync::oneshot::channel();
    flow.on_finish(move |state, result| {
        let _ = tx.send((state, result));
    });
    flow.start();

    let (state, result) = rx.await.expect("finish handler never fired");
    assert_eq!(state, FlowState::Finished);
    assert_eq!(result.unwrap(), vec![7]);
}

#[tokio::test]
async fn test_cancel_after_terminal_is_a_noop() {
    let flow = Flow::new(FlowConfig::default());
    flow.add_fn(|_ctx| async { Ok::<_, WorkError>(1u8) });
    assert_eq!(flow.run().await, FlowState::Finished);
    flow.cancel();
    assert_eq!(flow.state(), FlowState::Finished);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_at_most_one_terminal_callback_under_races() {
    for _ in 0..20 {
        let flow = Flow::new(FlowConfig::default());
        for i in 0..4u32 {
            flow.add_fn(move |_ctx| async move {
                tokio::time::sleep(Duration::from_micros(50)).await;
                Ok::<_, WorkError>(i)
            });
        }

        let fired = Arc::new(AtomicUsize::new(0));
        let f1 = Arc::clone(&fired);
        let f2 = Arc::clone(&fired);
        let f3 = Arc::clone(&fired);
        flow.on_finish(move |_, _| {
            f1.fetch_add(1, Ordering::SeqCst);
        });
        flow.on_error(move |_| {
            f2.fetch_add(1, Ordering::SeqCst);
        });
        flow.on_cancel(move || {
            f3.fetch_add(1, Ordering::SeqCst);
        });
        flow.start();

        // Hammer cancel from several tasks while the units complete.
        let mut cancelers = Vec::new();
        for _ in 0..4 {
            let flow = flow.clone();
            cancelers.push(tokio::spawn(async move {
                flow.cancel();
            }));
        }
        for c in cancelers {
            c.await.expect("canceler panicked");
        }

        let state = flow.join().await;
        assert!(state.is_terminal());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            fired.load(Ordering::SeqCst),
            1,
            "exactly one terminal callback must fire (state: {state:?})"
        );
    }
}
