//! Cadence: a polled finite state machine engine
//!
//! Cadence drives explicit state graphs on a cooperative tick. A graph is
//! declared up front as a [`Layout`](core::Layout) — an arena of states wired
//! by prioritized transitions — then handed to a
//! [`FiniteStateMachine`](machine::FiniteStateMachine) that the caller polls:
//! each `track` evaluates the current state's transitions in declaration
//! order and either fires the first satisfied one or runs the state's
//! in-state actions.
//!
//! # Core Concepts
//!
//! - **Condition**: side-effect-free predicates over time, telemetry, and
//!   custom values, composable with all/any/none
//! - **State**: named nodes carrying entering/in-state/exiting actions and
//!   per-state telemetry
//! - **Transition**: a target plus a condition, fired exit-then-enter with
//!   its own actions in between
//! - **Scheduler**: the polled `track` loop, with a bounded transition log
//!   for observers
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use cadence::builder::{timed_transition, StateBuilder};
//! use cadence::core::{Layout, ManualClock};
//! use cadence::machine::FiniteStateMachine;
//!
//! let mut layout = Layout::new();
//! let warming = layout.add_state(StateBuilder::new("warming").build()).unwrap();
//! let ready = layout
//!     .add_state(StateBuilder::new("ready").terminal().build())
//!     .unwrap();
//! layout
//!     .add_transition(warming, timed_transition(ready, warming, Duration::from_secs(2)))
//!     .unwrap();
//! layout.set_initial(warming).unwrap();
//!
//! let clock = ManualClock::new();
//! let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
//! machine.reset();
//!
//! machine.track().unwrap();
//! assert_eq!(machine.current_state_name(), Some("warming"));
//! clock.advance(Duration::from_secs(2));
//! machine.track().unwrap();
//! assert_eq!(machine.current_state_name(), Some("ready"));
//! ```

pub mod builder;
pub mod core;
pub mod machine;
pub mod patterns;

// Re-export commonly used types
pub use crate::core::{Condition, Layout, StateId, StateNode, Transition, Value};
pub use crate::machine::{FiniteStateMachine, OperationalState};
