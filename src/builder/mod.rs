//! Fluent construction helpers for states and common transitions.
//!
//! Graphs can be wired entirely through the core types; this module trims
//! the boilerplate for the two shapes that come up constantly — states with
//! a couple of lifecycle actions, and edges gated on dwell time or a custom
//! value.

use std::time::Duration;

use crate::core::{Condition, StateId, StateNode, StateParams, Transition, Value};

/// Fluent builder for a [`StateNode`].
///
/// # Example
///
/// ```rust
/// use cadence::builder::StateBuilder;
///
/// let red = StateBuilder::new("red")
///     .entering(|| println!("red on"))
///     .in_state(|| print!("."))
///     .exiting(|| println!("red off"))
///     .build();
/// assert_eq!(red.name(), "red");
/// assert!(!red.is_terminal());
/// ```
pub struct StateBuilder {
    node: StateNode,
    params: StateParams,
}

impl StateBuilder {
    /// Start building a state with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: StateNode::new(name),
            params: StateParams::default(),
        }
    }

    /// Mark the state terminal: entering it halts automatic ticking.
    pub fn terminal(mut self) -> Self {
        self.params.terminal = true;
        self
    }

    /// Also run the in-state actions right after the entering actions.
    pub fn run_in_state_on_enter(mut self) -> Self {
        self.params.run_in_state_on_enter = true;
        self
    }

    /// Also run the in-state actions right before the exiting actions.
    pub fn run_in_state_on_exit(mut self) -> Self {
        self.params.run_in_state_on_exit = true;
        self
    }

    /// Register an entering action.
    pub fn entering(mut self, action: impl FnMut() + 'static) -> Self {
        self.node.add_entering_action(action);
        self
    }

    /// Register an in-state action.
    pub fn in_state(mut self, action: impl FnMut() + 'static) -> Self {
        self.node.add_in_state_action(action);
        self
    }

    /// Register an exiting action.
    pub fn exiting(mut self, action: impl FnMut() + 'static) -> Self {
        self.node.add_exiting_action(action);
        self
    }

    /// Seed the state's custom value.
    pub fn custom_value(mut self, value: impl Into<Value>) -> Self {
        self.node.set_custom_value(value);
        self
    }

    /// Finish the node.
    pub fn build(mut self) -> StateNode {
        self.node.set_params(self.params);
        self.node
    }
}

/// An edge to `target` that fires once `monitored` has dwelled `after`.
///
/// The common traffic-light/blinker shape: `monitored` is usually the edge's
/// own source state.
pub fn timed_transition(target: StateId, monitored: StateId, after: Duration) -> Transition {
    Transition::to(target).when(Condition::entry_duration(monitored, after))
}

/// An edge to `target` that fires while `monitored`'s custom value equals
/// `expected`. The branch-state shape.
pub fn value_branch(target: StateId, monitored: StateId, expected: impl Into<Value>) -> Transition {
    Transition::to(target).when(Condition::state_value(monitored, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Layout;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn builder_sets_params() {
        let state = StateBuilder::new("end")
            .terminal()
            .run_in_state_on_enter()
            .build();
        assert!(state.is_terminal());
        assert!(state.params().run_in_state_on_enter);
        assert!(!state.params().run_in_state_on_exit);
    }

    #[test]
    fn builder_wires_actions_and_value() {
        let entered = Rc::new(Cell::new(false));
        let e = Rc::clone(&entered);
        let mut state = StateBuilder::new("s")
            .entering(move || e.set(true))
            .custom_value("mode")
            .build();
        assert_eq!(state.custom_value(), &Value::from("mode"));
        state.exec_entering_action(Duration::ZERO);
        assert!(entered.get());
    }

    #[test]
    fn timed_transition_gates_on_dwell() {
        let mut layout = Layout::new();
        let a = layout.add_state(StateBuilder::new("a").build()).unwrap();
        let b = layout
            .add_state(StateBuilder::new("b").terminal().build())
            .unwrap();
        let edge = timed_transition(b, a, Duration::from_secs(3));
        layout
            .state_mut(a)
            .unwrap()
            .exec_entering_action(Duration::ZERO);
        assert!(!edge.is_transiting(&layout.ctx(Duration::from_secs(2))));
        assert!(edge.is_transiting(&layout.ctx(Duration::from_secs(3))));
    }

    #[test]
    fn value_branch_gates_on_custom_value() {
        let mut layout = Layout::new();
        let a = layout.add_state(StateBuilder::new("a").build()).unwrap();
        let b = layout
            .add_state(StateBuilder::new("b").terminal().build())
            .unwrap();
        let edge = value_branch(b, a, true);
        assert!(!edge.is_transiting(&layout.ctx(Duration::ZERO)));
        layout.state_mut(a).unwrap().set_custom_value(true);
        assert!(edge.is_transiting(&layout.ctx(Duration::ZERO)));
    }
}
