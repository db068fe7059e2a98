//! # Validation gate: an asynchronous pass/fail predicate.
//!
//! A [`Gate`] has the same shape as a work unit but reports a boolean
//! verdict instead of a value. The flow compares the verdict against its
//! configured expectation to decide whether a loop continues; an `Err` from
//! a gate is always terminal, regardless of any verdict.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;

/// Shared handle to a validation gate.
pub type GateRef = Arc<dyn Gate>;

/// # Asynchronous pass/fail check.
///
/// `Ok(verdict)` is compared against the flow's expected verdict;
/// `Err(error)` fails the flow immediately.
#[async_trait]
pub trait Gate: Send + Sync + 'static {
    /// Returns a stable, human-readable gate name.
    fn name(&self) -> &str;

    /// Evaluates the predicate once.
    ///
    /// Invoked before or after every batch of a gated flow, so
    /// implementations must be re-runnable.
    async fn check(&self, ctx: CancellationToken) -> Result<bool, WorkError>;
}

/// Function-backed gate implementation.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use flowvisor::{GateFn, GateRef};
///
/// let remaining = Arc::new(AtomicU32::new(3));
/// let gate: GateRef = GateFn::arc("countdown", move |_ctx| {
///     let remaining = Arc::clone(&remaining);
///     async move { Ok(remaining.fetch_sub(1, Ordering::SeqCst) > 0) }
/// });
/// assert_eq!(gate.name(), "countdown");
/// ```
#[derive(Debug)]
pub struct GateFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> GateFn<F> {
    /// Creates a new function-backed gate.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the gate and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Gate for GateFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, ctx: CancellationToken) -> Result<bool, WorkError> {
        (self.f)(ctx).await
    }
}
