//! # Notification context for callback delivery.
//!
//! [`Notifier`] is the single fixed context every flow callback runs on: a
//! dedicated consumer task fed by an unbounded channel. Posting never blocks
//! and never runs the callback on the posting thread, so terminal callbacks
//! cannot interleave with each other, re-enter engine locks, or grow the
//! worker's call stack.
//!
//! A flow that is not given a notifier spawns a private one when it starts.
//! Embedders that need callbacks on their own context (a UI loop, an actor,
//! a test harness) build one [`Notifier`] there and share it across flows:
//!
//! ```rust
//! use flowvisor::Notifier;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let notifier = Notifier::spawn();
//!     // pass `notifier.clone()` to each flow via `with_notifier`
//!     # drop(notifier);
//! }
//! ```

use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Serialized execution context for user callbacks.
///
/// Cheap to clone; all clones feed the same consumer task, so jobs posted
/// from any thread run one at a time, in posting order.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Job>,
}

impl Notifier {
    /// Spawns the consumer task on the current tokio runtime.
    ///
    /// The task exits once every clone of this notifier has been dropped
    /// and the queue has drained.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { tx }
    }

    /// Enqueues a job for the consumer task.
    pub(crate) fn post(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!("notifier consumer gone; callback dropped");
        }
    }
}
