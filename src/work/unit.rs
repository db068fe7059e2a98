//! # Work abstraction.
//!
//! A [`Work`] unit is an async, cancelable computation that produces one
//! typed value or one [`WorkError`] per invocation. It receives a
//! [`CancellationToken`] and should check it cooperatively so the flow can
//! interrupt it.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;

/// # Asynchronous, cancelable unit with a typed result.
///
/// A `Work<T>` has a stable [`name`](Work::name) and an async
/// [`run`](Work::run) method. The awaited return value is the unit's single
/// completion for that invocation: `Ok(value)` or `Err(error)` — never both,
/// never twice.
///
/// Implementors should regularly check `ctx.is_cancelled()` and return
/// [`WorkError::Canceled`] promptly when the flow is being torn down.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use flowvisor::{Work, WorkError};
///
/// struct Fetch;
///
/// #[async_trait]
/// impl Work<u64> for Fetch {
///     fn name(&self) -> &str { "fetch" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<u64, WorkError> {
///         if ctx.is_cancelled() {
///             return Err(WorkError::Canceled);
///         }
///         // do work...
///         Ok(42)
///     }
/// }
/// ```
#[async_trait]
pub trait Work<T>: Send + Sync + 'static {
    /// Returns a stable, human-readable unit name.
    fn name(&self) -> &str;

    /// Executes one attempt of the unit until completion or cancellation.
    ///
    /// May be invoked again by the runner when a retryable error is
    /// reported and budget remains, so implementations must be re-runnable.
    async fn run(&self, ctx: CancellationToken) -> Result<T, WorkError>;
}
