//! # Work and gate abstractions.
//!
//! This module provides the schedulable-unit types:
//! - [`Work`] - trait for implementing async cancelable units with a typed result
//! - [`WorkFn`] - function-backed work implementation
//! - [`WorkRef`] - shared reference to a unit (`Arc<dyn Work<T>>`)
//! - [`Gate`] / [`GateFn`] / [`GateRef`] - the asynchronous pass/fail predicate
//!   used to gate loop continuation

mod gate;
mod unit;
mod unit_fn;

pub use gate::{Gate, GateFn, GateRef};
pub use unit::Work;
pub use unit_fn::{WorkFn, WorkRef};
