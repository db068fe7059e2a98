//! # Flow configuration.
//!
//! [`FlowConfig`] defines one flow's execution policies: concurrency cap,
//! executor priority hint, output ordering, per-unit retry budget, gate
//! placement, and event-bus capacity.
//!
//! # Example
//! ```
//! use flowvisor::{FlowConfig, Priority};
//!
//! let cfg = FlowConfig::default()
//!     .with_concurrency(2)
//!     .with_priority(Priority::Low)
//!     .with_ordered_output(true)
//!     .with_retry_limit(3);
//!
//! assert_eq!(cfg.concurrency, 2);
//! assert_eq!(cfg.retry_limit, 3);
//! ```

use crate::executor::Priority;

/// Execution policies for one flow.
///
/// Constructed with [`FlowConfig::default`] and adjusted through the
/// fluent `with_*` setters (or by writing the public fields directly).
#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// Maximum number of units in flight at once (0 = unbounded).
    ///
    /// A cap of 1 runs units strictly serially in submission order.
    pub concurrency: usize,
    /// Quality-of-service hint forwarded to the executor.
    pub priority: Priority,
    /// Present final values sorted by submission index instead of
    /// completion order.
    pub ordered_output: bool,
    /// Retries each unit gets on a retryable error before the failure
    /// becomes terminal (`R` retries = `R + 1` attempts).
    pub retry_limit: u32,
    /// Run the validation gate before each batch (while-style) instead of
    /// after it (do-while-style). Only meaningful when a gate is set.
    pub validate_before_run: bool,
    /// Gate verdict that lets the loop continue; any other verdict stops
    /// the flow with whatever has accumulated.
    pub expected_validation: bool,
    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,
}

impl Default for FlowConfig {
    /// Provides a default configuration:
    /// - `concurrency = 0` (unbounded)
    /// - `priority = Priority::Normal`
    /// - `ordered_output = false` (completion order)
    /// - `retry_limit = 0`
    /// - `validate_before_run = false`
    /// - `expected_validation = true`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            concurrency: 0,
            priority: Priority::default(),
            ordered_output: false,
            retry_limit: 0,
            validate_before_run: false,
            expected_validation: true,
            bus_capacity: 1024,
        }
    }
}

impl FlowConfig {
    /// Sets the concurrency cap (0 = unbounded).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the executor priority hint.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Selects index-ordered (`true`) or completion-ordered (`false`) output.
    pub fn with_ordered_output(mut self, ordered: bool) -> Self {
        self.ordered_output = ordered;
        self
    }

    /// Sets the per-unit retry budget.
    pub fn with_retry_limit(mut self, retries: u32) -> Self {
        self.retry_limit = retries;
        self
    }

    /// Places the gate before each batch instead of after it.
    pub fn with_validate_before_run(mut self, before: bool) -> Self {
        self.validate_before_run = before;
        self
    }

    /// Sets the gate verdict that lets the loop continue.
    pub fn with_expected_validation(mut self, expected: bool) -> Self {
        self.expected_validation = expected;
        self
    }

    /// Sets the lifecycle event bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }
}
