//! The scheduler that drives a state graph on a polled tick.
//!
//! [`FiniteStateMachine`] owns a validated [`Layout`](crate::core::Layout)
//! and sequences it: each [`track`](FiniteStateMachine::track) call evaluates
//! the current state's transitions in priority order and either fires the
//! first satisfied one (exit, transit, enter — in that order) or runs the
//! current state's in-state actions. [`TransitionLog`] keeps the recent
//! firing history for observers.

mod history;
mod scheduler;

pub use history::{TransitionLog, TransitionRecord};
pub use scheduler::{FiniteStateMachine, MachineError, OperationalState};
