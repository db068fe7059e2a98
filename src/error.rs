//! Error types used by the flow engine and work closures.
//!
//! This module defines two main error enums:
//!
//! - [`WorkError`] — errors raised by a single work or gate closure.
//! - [`FlowError`] — the terminal error carried by a failed flow.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics, and [`WorkError::is_retryable`] drives the per-unit
//! retry budget.
//!
//! Mis-sequenced API calls (starting a flow twice, configuring it after
//! start, cancelling a flow that is not running) are not errors at all:
//! they are rejected as no-ops and logged at `warn` level.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by a work or gate closure.
///
/// A closure reports exactly one of these per invocation (as the `Err` arm
/// of its return value). [`WorkError::Fail`] is retryable while budget
/// remains; [`WorkError::Fatal`] always terminates immediately.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// Execution failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error; the remaining retry budget is skipped.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The closure observed its [`CancellationToken`](tokio_util::sync::CancellationToken)
    /// and exited cooperatively.
    ///
    /// Return this only in response to token cancellation: the runner treats
    /// it as a graceful exit that produces no outcome, not as a failure.
    #[error("context cancelled")]
    Canceled,
}

impl WorkError {
    /// Creates a retryable failure from any displayable error.
    pub fn fail(error: impl Into<String>) -> Self {
        WorkError::Fail {
            error: error.into(),
        }
    }

    /// Creates a fatal (never retried) failure from any displayable error.
    pub fn fatal(error: impl Into<String>) -> Self {
        WorkError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use flowvisor::WorkError;
    ///
    /// assert_eq!(WorkError::fail("boom").as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Fatal { .. } => "work_fatal",
            WorkError::Canceled => "work_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Fail { error } => format!("error: {error}"),
            WorkError::Fatal { error } => format!("fatal: {error}"),
            WorkError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Indicates whether the error consumes retry budget rather than
    /// terminating the unit outright.
    ///
    /// Returns `true` only for [`WorkError::Fail`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkError::Fail { .. })
    }
}

/// # Terminal error carried by a failed flow.
///
/// The first error encountered wins: later outcomes are discarded, not
/// collected. The `order` on [`FlowError::Work`] identifies the unit (by
/// submission index) whose failure terminated the flow.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A work unit exhausted its retries (or failed fatally).
    #[error("unit {order} failed: {source}")]
    Work {
        /// Submission index of the failing unit.
        order: usize,
        /// The unit's terminal error.
        #[source]
        source: WorkError,
    },

    /// The validation gate reported an error.
    ///
    /// Always terminal, regardless of any pass/fail verdict.
    #[error("validation gate failed: {source}")]
    Validation {
        /// The gate's error.
        #[source]
        source: WorkError,
    },
}

impl FlowError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FlowError::Work { .. } => "flow_work_failed",
            FlowError::Validation { .. } => "flow_validation_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FlowError::Work { order, source } => {
                format!("unit {order}: {}", source.as_message())
            }
            FlowError::Validation { source } => {
                format!("gate: {}", source.as_message())
            }
        }
    }

    /// Returns the underlying closure error.
    pub fn work_error(&self) -> &WorkError {
        match self {
            FlowError::Work { source, .. } => source,
            FlowError::Validation { source } => source,
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fail_is_retryable() {
        assert!(WorkError::fail("boom").is_retryable());
        assert!(!WorkError::fatal("boom").is_retryable());
        assert!(!WorkError::Canceled.is_retryable());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(WorkError::fatal("x").as_label(), "work_fatal");
        let err = FlowError::Work {
            order: 3,
            source: WorkError::fail("x"),
        };
        assert_eq!(err.as_label(), "flow_work_failed");
        assert_eq!(err.work_error(), &WorkError::fail("x"));
    }

    #[test]
    fn test_display_includes_order() {
        let err = FlowError::Work {
            order: 7,
            source: WorkError::fail("nope"),
        };
        assert_eq!(err.to_string(), "unit 7 failed: execution failed: nope");
    }

    #[test]
    fn test_panic_reason_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom");
        assert_eq!(panic_reason(payload.as_ref()), "kaboom");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_reason(payload.as_ref()), "panic with non-string payload");
    }
}
