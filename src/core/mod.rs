//! Core state machine building blocks.
//!
//! This module contains everything below the scheduler:
//! - [`Value`]: the closed custom-value channel
//! - [`Clock`] implementations for production and tests
//! - [`Condition`]: the composable predicate hierarchy
//! - [`StateNode`] / [`Transition`]: nodes and condition-gated edges
//! - [`Layout`]: the owned, validated state graph
//!
//! Nothing here runs on its own; the scheduler in [`crate::machine`] drives
//! these pieces on a polled tick.

mod clock;
mod condition;
mod layout;
mod state;
mod transition;
mod value;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use condition::{Condition, ConditionCtx, ConditionError};
pub use layout::{Layout, LayoutError};
pub use state::{Action, StateId, StateNode, StateParams, StateTelemetry};
pub use transition::{Transition, TransitionTelemetry};
pub use value::Value;
