//! # flowvisor
//!
//! **Flowvisor** is a lightweight flow-orchestration library for Rust.
//!
//! It composes units of asynchronous work (closures that report one typed
//! value or one error) into higher-level control-flow patterns — sequential
//! chains, bounded-parallel fan-out, repeat-N, while-condition loops, and
//! validated loops — behind a uniform lifecycle with callback-based
//! notification.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   WorkRef    │   │   WorkRef    │   │   GateRef    │
//!     │(user unit #1)│   │(user unit #2)│   │ (validation) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Flow (lifecycle state machine, one drive task per flow)          │
//! │  - Executor (permit-gated dispatch, priority hint)                │
//! │  - Aggregator (race-free outcome store, batch-completion signal)  │
//! │  - Notifier (serialized terminal-callback delivery)               │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │ unit runner  │   │ unit runner  │   │ unit runner  │   │
//!     │ (retry loop) │   │ (retry loop) │   │ (retry loop) │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ accept(order,    │                  │                 │
//!      │   Ok/Err)        │                  │                 ▼
//!      ▼                  ▼                  ▼        Bus ──► SubscriberSet
//! ┌───────────────────────────────────────────────┐   (queue per subscriber,
//! │  Aggregator: N-of-N / first-error / cancel    │    panic isolation)
//! │  → exactly one batch signal → drive task      │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Queued ──► [Testing] ──► Running ──► [Testing] ──► Finished
//!                │            │                        ▲
//!                │            ├──► Failed (first error │ wins, in-flight
//!                │            │         work canceled) │ gate loop repeats
//!                │            └──► Canceled            │
//!                └──► Finished (gate stopped the loop before any work)
//! ```
//!
//! Exactly one of the finish/error/cancel callbacks fires per flow, on a
//! fixed notification context, after every outcome that will ever be
//! counted is recorded.
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits            |
//! |-----------------|----------------------------------------------------------|-------------------------------|
//! | **Flows**       | Configure, start, cancel, await one lifecycle.           | [`Flow`], [`FlowConfig`]      |
//! | **Work**        | Typed async cancelable units and validation gates.       | [`Work`], [`WorkFn`], [`Gate`]|
//! | **Patterns**    | Named shapes over the same engine.                       | [`sequence`], [`chain`], [`repeat`], [`while_passes`], [`fan_out`], [`forever`] |
//! | **Errors**      | Typed errors with retry classification.                  | [`WorkError`], [`FlowError`]  |
//! | **Observability**| Lifecycle events fanned out to subscriber hooks.        | [`Event`], [`Subscribe`]      |
//! | **Delivery**    | Serialized callback context, injectable for embedding.   | [`Notifier`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use flowvisor::{Flow, FlowConfig, FlowState, WorkError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Five units, at most two in flight, values presented by index.
//!     let flow = Flow::new(
//!         FlowConfig::default()
//!             .with_concurrency(2)
//!             .with_ordered_output(true),
//!     );
//!     for i in 0..5usize {
//!         flow.add_fn(move |_ctx| async move { Ok::<_, WorkError>(i) });
//!     }
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     flow.on_finish(move |state, result| {
//!         let _ = tx.send((state, result));
//!     });
//!
//!     flow.start();
//!     let (state, result) = rx.await.unwrap();
//!     assert_eq!(state, FlowState::Finished);
//!     assert_eq!(result.unwrap(), vec![0, 1, 2, 3, 4]);
//! }
//! ```

mod config;
mod engine;
mod error;
mod events;
mod executor;
mod notify;
mod patterns;
mod state;
mod subscribers;
mod work;

// ---- Public re-exports ----

pub use config::FlowConfig;
pub use engine::{Flow, Outcome};
pub use error::{FlowError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use executor::{Executor, Priority};
pub use notify::Notifier;
pub use patterns::{chain, fan_out, forever, repeat, sequence, while_passes};
pub use state::{FlowResult, FlowState};
pub use subscribers::{Subscribe, SubscriberSet};
pub use work::{Gate, GateFn, GateRef, Work, WorkFn, WorkRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
