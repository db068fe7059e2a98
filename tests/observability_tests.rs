//! Lifecycle events: bus tap and subscriber fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowvisor::{Event, EventKind, Flow, FlowConfig, FlowState, Subscribe, WorkError};

struct Counter {
    starts: AtomicUsize,
    successes: AtomicUsize,
}

#[async_trait]
impl Subscribe for Counter {
    async fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::UnitStarting => {
                self.starts.fetch_add(1, Ordering::SeqCst);
            }
            EventKind::UnitSucceeded => {
                self.successes.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "counter"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscriber_observes_unit_lifecycle() {
    let counter = Arc::new(Counter {
        starts: AtomicUsize::new(0),
        successes: AtomicUsize::new(0),
    });

    let flow = Flow::new(FlowConfig::default());
    for i in 0..3u32 {
        flow.add_fn(move |_ctx| async move { Ok::<_, WorkError>(i) });
    }
    flow.subscribe(counter.clone());
    assert_eq!(flow.run().await, FlowState::Finished);

    // Fan-out is asynchronous; give the workers a moment to drain.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while counter.successes.load(Ordering::SeqCst) < 3 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "subscriber never saw the unit events"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(counter.starts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_bus_tap_sees_flow_and_retry_events() {
    let flow = Flow::new(FlowConfig::default().with_retry_limit(1));
    let attempts = Arc::new(AtomicUsize::new(0));
    let state = Arc::clone(&attempts);
    flow.add_fn(move |_ctx| {
        let state = Arc::clone(&state);
        async move {
            if state.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(WorkError::fail("first try"))
            } else {
                Ok(1u32)
            }
        }
    });

    let mut events = flow.events();
    assert_eq!(flow.run().await, FlowState::Finished);

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::FlowStarted));
    assert!(kinds.contains(&EventKind::RetryScheduled));
    assert!(kinds.contains(&EventKind::UnitSucceeded));
    assert!(kinds.contains(&EventKind::FlowFinished));
}
