//! Layouts: the owned, validated state graph of one machine.
//!
//! A [`Layout`] is an arena of [`StateNode`]s plus a designated initial
//! state. It is the sole owner of states, transitions, and conditions, which
//! is what breaks the reference cycles of the domain (a condition gating an
//! edge back into the state it monitors): everything below the layout holds
//! [`StateId`] handles, never owning references.
//!
//! Configuration defects are reported synchronously at the call that
//! introduces them; [`Layout::validate`] re-checks the whole graph before a
//! machine may run.

use std::time::Duration;

use thiserror::Error;

use super::condition::ConditionCtx;
use super::state::{StateId, StateNode};
use super::transition::Transition;

/// Configuration and validation defects in a state graph.
///
/// These are programmer errors: not retried, not recovered. The caller must
/// fix the wiring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("a state named '{0}' is already in the layout")]
    DuplicateState(String),

    #[error("state handle {0} does not belong to this layout")]
    UnknownState(usize),

    #[error("transition from '{from}' targets unknown state handle {target}")]
    UnknownTarget { from: String, target: usize },

    #[error("condition on a transition from '{from}' monitors unknown state handle {state}")]
    DanglingConditionRef { from: String, state: usize },

    #[error("state '{0}' is neither terminal nor has an outgoing transition")]
    DeadEndState(String),

    #[error("initial state not set")]
    MissingInitialState,
}

/// The immutable-once-built set of states for one machine.
///
/// # Example
///
/// ```rust
/// use cadence::core::{Condition, Layout, StateNode, StateParams, Transition};
///
/// let mut layout = Layout::new();
/// let work = layout.add_state(StateNode::new("work")).unwrap();
/// let done = layout
///     .add_state(StateNode::with_params(
///         "done",
///         StateParams { terminal: true, ..StateParams::default() },
///     ))
///     .unwrap();
/// layout.add_transition(work, Transition::to(done)).unwrap();
/// layout.set_initial(work).unwrap();
/// assert!(layout.validate().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct Layout {
    states: Vec<StateNode>,
    initial: Option<StateId>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state, returning its handle. Insertion order is preserved.
    ///
    /// States are identified by name within a layout; adding a second state
    /// with the same name is the duplicate-insertion defect and is rejected.
    pub fn add_state(&mut self, state: StateNode) -> Result<StateId, LayoutError> {
        if self.states.iter().any(|s| s.name() == state.name()) {
            return Err(LayoutError::DuplicateState(state.name().to_string()));
        }
        self.states.push(state);
        Ok(StateId(self.states.len() - 1))
    }

    /// Wire an outgoing transition onto `from`.
    ///
    /// Both endpoints and every state handle referenced by the gating
    /// condition must already belong to this layout.
    pub fn add_transition(
        &mut self,
        from: StateId,
        transition: Transition,
    ) -> Result<(), LayoutError> {
        let len = self.states.len();
        if from.index() >= len {
            return Err(LayoutError::UnknownState(from.index()));
        }
        let from_name = self.states[from.index()].name().to_string();
        if transition.target().index() >= len {
            return Err(LayoutError::UnknownTarget {
                from: from_name,
                target: transition.target().index(),
            });
        }
        let mut dangling = None;
        transition.condition().for_each_state(&mut |id| {
            if id.index() >= len && dangling.is_none() {
                dangling = Some(id.index());
            }
        });
        if let Some(state) = dangling {
            return Err(LayoutError::DanglingConditionRef {
                from: from_name,
                state,
            });
        }
        self.states[from.index()].add_transition(transition);
        Ok(())
    }

    /// Designate the initial state. It must already be a member.
    pub fn set_initial(&mut self, state: StateId) -> Result<(), LayoutError> {
        if state.index() >= self.states.len() {
            return Err(LayoutError::UnknownState(state.index()));
        }
        self.initial = Some(state);
        Ok(())
    }

    /// The designated initial state, if set.
    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    /// Borrow a state by handle.
    pub fn state(&self, id: StateId) -> Option<&StateNode> {
        self.states.get(id.index())
    }

    /// Mutably borrow a state by handle.
    pub fn state_mut(&mut self, id: StateId) -> Option<&mut StateNode> {
        self.states.get_mut(id.index())
    }

    /// Look a state up by name.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name() == name).map(StateId)
    }

    /// All states, in insertion order.
    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the layout holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Build a condition-evaluation context at a given time reading.
    pub fn ctx(&self, now: Duration) -> ConditionCtx<'_> {
        ConditionCtx::new(&self.states, now)
    }

    /// Check the whole graph: an initial state is designated, every
    /// non-terminal state has at least one outgoing transition, and every
    /// handle wired anywhere resolves within this layout.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.initial.is_none() {
            return Err(LayoutError::MissingInitialState);
        }
        let len = self.states.len();
        for state in &self.states {
            if !state.is_terminal() && state.transitions().is_empty() {
                return Err(LayoutError::DeadEndState(state.name().to_string()));
            }
            for transition in state.transitions() {
                if transition.target().index() >= len {
                    return Err(LayoutError::UnknownTarget {
                        from: state.name().to_string(),
                        target: transition.target().index(),
                    });
                }
                let mut dangling = None;
                transition.condition().for_each_state(&mut |id| {
                    if id.index() >= len && dangling.is_none() {
                        dangling = Some(id.index());
                    }
                });
                if let Some(bad) = dangling {
                    return Err(LayoutError::DanglingConditionRef {
                        from: state.name().to_string(),
                        state: bad,
                    });
                }
            }
        }
        Ok(())
    }

    /// Arena access for the scheduler. Handles are validated before a
    /// machine runs, so indexing is infallible from there on.
    pub(crate) fn node(&self, id: StateId) -> &StateNode {
        &self.states[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: StateId) -> &mut StateNode {
        &mut self.states[id.index()]
    }
}
