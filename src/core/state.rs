//! State nodes and their lifecycle protocol.
//!
//! A [`StateNode`] folds the whole state/action-state/monitored-state
//! capability stack into one composed value: behavior parameters, the three
//! ordered lifecycle action lists, the ordered outgoing transitions, and
//! always-on dwell telemetry. Nodes live in a [`Layout`](super::Layout) arena
//! and are addressed by [`StateId`] handles, never by reference, which keeps
//! conditions free of ownership cycles.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::condition::ConditionCtx;
use super::transition::Transition;
use super::value::Value;

/// Handle to a state inside a [`Layout`](super::Layout) arena.
///
/// Handles are plain indices: cheap to copy, comparable, hashable. A handle
/// is only meaningful against the layout that issued it; using it against
/// another layout is caught by that layout's validation, not at the type
/// level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Arena index of this state.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Behavior parameters of a state.
///
/// # Example
///
/// ```rust
/// use cadence::core::StateParams;
///
/// let params = StateParams {
///     terminal: true,
///     ..StateParams::default()
/// };
/// assert!(params.terminal);
/// assert!(!params.run_in_state_on_enter);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateParams {
    /// Once entered, the scheduler halts automatic ticking.
    pub terminal: bool,
    /// Run the in-state action list right after the entering actions.
    pub run_in_state_on_enter: bool,
    /// Run the in-state action list right before the exiting actions.
    pub run_in_state_on_exit: bool,
}

/// Dwell telemetry of a state, updated by the owning scheduler.
///
/// `last_entry_time` is stamped (and the entry counter bumped) before the
/// entering actions run, and `last_exit_time` after the exiting actions
/// finish, so [`Condition::entry_duration`](super::Condition::entry_duration)
/// measures true dwell time from the instant of entry. Times are monotonic
/// offsets from the machine clock's origin; `None` means the state was never
/// entered/exited since the last reset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTelemetry {
    /// Number of entries into the state since the last counter reset.
    pub entry_count: u64,
    /// Clock offset of the most recent entry.
    pub last_entry_time: Option<Duration>,
    /// Clock offset of the most recent exit.
    pub last_exit_time: Option<Duration>,
    /// The state's externally observable mode tag.
    pub custom_value: Value,
}

/// A zero-argument side-effect callback registered on a state or transition.
///
/// Actions take no arguments and return nothing; they may read or write
/// arbitrary external state (drive a motor, flip an LED) but must not block
/// indefinitely, since they run on the scheduler thread. No `Send` bound:
/// the engine is single-threaded and callbacks routinely capture `Rc`-shared
/// hardware handles.
pub type Action = Box<dyn FnMut()>;

/// A node in a state machine graph.
///
/// Nodes are built by application code (directly or via
/// [`StateBuilder`](crate::builder::StateBuilder)), wired with transitions,
/// and handed over to a [`Layout`](super::Layout), which owns them for the
/// lifetime of the machine.
///
/// # Example
///
/// ```rust
/// use cadence::core::StateNode;
///
/// let mut on = StateNode::new("on");
/// on.add_entering_action(|| println!("light on"));
/// on.add_in_state_action(|| println!("still on"));
/// on.add_exiting_action(|| println!("light off"));
/// assert_eq!(on.name(), "on");
/// ```
pub struct StateNode {
    name: String,
    params: StateParams,
    entering_actions: Vec<Action>,
    in_state_actions: Vec<Action>,
    exiting_actions: Vec<Action>,
    transitions: Vec<Transition>,
    telemetry: StateTelemetry,
}

impl StateNode {
    /// Create a node with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_params(name, StateParams::default())
    }

    /// Create a node with explicit parameters.
    pub fn with_params(name: impl Into<String>, params: StateParams) -> Self {
        Self {
            name: name.into(),
            params,
            entering_actions: Vec::new(),
            in_state_actions: Vec::new(),
            exiting_actions: Vec::new(),
            transitions: Vec::new(),
            telemetry: StateTelemetry::default(),
        }
    }

    /// The state's name, used for lookup and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state's behavior parameters.
    pub fn params(&self) -> StateParams {
        self.params
    }

    pub(crate) fn set_params(&mut self, params: StateParams) {
        self.params = params;
    }

    /// Whether entering this state halts automatic ticking.
    pub fn is_terminal(&self) -> bool {
        self.params.terminal
    }

    /// Register an action to run when the state is entered.
    ///
    /// Actions run in registration order.
    pub fn add_entering_action(&mut self, action: impl FnMut() + 'static) {
        self.entering_actions.push(Box::new(action));
    }

    /// Register an action to run on each tick spent inside the state.
    pub fn add_in_state_action(&mut self, action: impl FnMut() + 'static) {
        self.in_state_actions.push(Box::new(action));
    }

    /// Register an action to run when the state is exited.
    pub fn add_exiting_action(&mut self, action: impl FnMut() + 'static) {
        self.exiting_actions.push(Box::new(action));
    }

    /// Append an outgoing transition.
    ///
    /// Insertion order is the evaluation order: on each tick the first
    /// satisfied transition wins and later ones are not evaluated at all.
    pub fn add_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// The outgoing transitions, in priority order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub(crate) fn transition_mut(&mut self, index: usize) -> Option<&mut Transition> {
        self.transitions.get_mut(index)
    }

    /// The state's dwell telemetry.
    pub fn telemetry(&self) -> &StateTelemetry {
        &self.telemetry
    }

    /// The state's current custom value.
    pub fn custom_value(&self) -> &Value {
        &self.telemetry.custom_value
    }

    /// Set the state's custom value.
    ///
    /// This is the sanctioned external-input channel: collaborators write a
    /// mode tag here and value conditions gate transitions on it.
    pub fn set_custom_value(&mut self, value: impl Into<Value>) {
        self.telemetry.custom_value = value.into();
    }

    /// Zero the entry counter without touching any wiring.
    pub fn reset_entry_count(&mut self) {
        self.telemetry.entry_count = 0;
    }

    /// Clear the entry/exit timestamps without touching any wiring.
    pub fn reset_last_times(&mut self) {
        self.telemetry.last_entry_time = None;
        self.telemetry.last_exit_time = None;
    }

    /// Index of the first outgoing transition whose condition currently
    /// holds, scanning in insertion order.
    ///
    /// Side-effect-free: the scheduler may probe without committing.
    pub fn first_transiting(&self, ctx: &ConditionCtx<'_>) -> Option<usize> {
        self.transitions.iter().position(|t| t.is_transiting(ctx))
    }

    /// Entry protocol: stamp telemetry, then entering actions, then the
    /// in-state list when `run_in_state_on_enter` is set.
    pub(crate) fn exec_entering_action(&mut self, now: Duration) {
        self.telemetry.last_entry_time = Some(now);
        self.telemetry.entry_count += 1;
        for action in &mut self.entering_actions {
            action();
        }
        if self.params.run_in_state_on_enter {
            self.exec_in_state_action();
        }
    }

    /// Run the in-state action list.
    pub(crate) fn exec_in_state_action(&mut self) {
        for action in &mut self.in_state_actions {
            action();
        }
    }

    /// Exit protocol: the in-state list when `run_in_state_on_exit` is set,
    /// then exiting actions, then the exit timestamp.
    pub(crate) fn exec_exiting_action(&mut self, now: Duration) {
        if self.params.run_in_state_on_exit {
            self.exec_in_state_action();
        }
        for action in &mut self.exiting_actions {
            action();
        }
        self.telemetry.last_exit_time = Some(now);
    }
}

impl fmt::Debug for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("transitions", &self.transitions.len())
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Condition;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Trace = Rc<RefCell<Vec<&'static str>>>;

    fn tracer(log: &Trace, tag: &'static str) -> impl FnMut() {
        let log = Rc::clone(log);
        move || log.borrow_mut().push(tag)
    }

    #[test]
    fn entry_stamps_time_and_count() {
        let mut node = StateNode::new("s");
        node.exec_entering_action(Duration::from_secs(3));
        assert_eq!(node.telemetry().entry_count, 1);
        assert_eq!(
            node.telemetry().last_entry_time,
            Some(Duration::from_secs(3))
        );
        assert_eq!(node.telemetry().last_exit_time, None);
    }

    #[test]
    fn entry_count_accumulates_and_resets() {
        let mut node = StateNode::new("s");
        for _ in 0..3 {
            node.exec_entering_action(Duration::ZERO);
        }
        assert_eq!(node.telemetry().entry_count, 3);
        node.reset_entry_count();
        assert_eq!(node.telemetry().entry_count, 0);
        // Wiring untouched: the node keeps counting afterwards.
        node.exec_entering_action(Duration::from_secs(1));
        assert_eq!(node.telemetry().entry_count, 1);
    }

    #[test]
    fn reset_last_times_clears_stamps() {
        let mut node = StateNode::new("s");
        node.exec_entering_action(Duration::from_secs(1));
        node.exec_exiting_action(Duration::from_secs(2));
        node.reset_last_times();
        assert_eq!(node.telemetry().last_entry_time, None);
        assert_eq!(node.telemetry().last_exit_time, None);
    }

    #[test]
    fn actions_run_in_insertion_order() {
        let log: Trace = Rc::default();
        let mut node = StateNode::new("s");
        node.add_entering_action(tracer(&log, "enter-1"));
        node.add_entering_action(tracer(&log, "enter-2"));
        node.exec_entering_action(Duration::ZERO);
        assert_eq!(*log.borrow(), vec!["enter-1", "enter-2"]);
    }

    #[test]
    fn run_in_state_on_enter_appends_in_state_actions() {
        let log: Trace = Rc::default();
        let params = StateParams {
            run_in_state_on_enter: true,
            ..StateParams::default()
        };
        let mut node = StateNode::with_params("s", params);
        node.add_entering_action(tracer(&log, "enter"));
        node.add_in_state_action(tracer(&log, "in"));
        node.exec_entering_action(Duration::ZERO);
        assert_eq!(*log.borrow(), vec!["enter", "in"]);
    }

    #[test]
    fn run_in_state_on_exit_runs_before_exiting_actions() {
        let log: Trace = Rc::default();
        let params = StateParams {
            run_in_state_on_exit: true,
            ..StateParams::default()
        };
        let mut node = StateNode::with_params("s", params);
        node.add_in_state_action(tracer(&log, "in"));
        node.add_exiting_action(tracer(&log, "exit"));
        node.exec_exiting_action(Duration::from_secs(9));
        assert_eq!(*log.borrow(), vec!["in", "exit"]);
        assert_eq!(
            node.telemetry().last_exit_time,
            Some(Duration::from_secs(9))
        );
    }

    #[test]
    fn first_transiting_respects_insertion_order() {
        let mut target = StateNode::new("target");
        target.params.terminal = true;
        let arena = vec![target];
        let mut node = StateNode::new("s");
        node.add_transition(Transition::to(StateId(0)).when(Condition::never()));
        node.add_transition(Transition::to(StateId(0)));
        node.add_transition(Transition::to(StateId(0)));
        let ctx = ConditionCtx::new(&arena, Duration::ZERO);
        // First always-true edge wins; the later one is not considered.
        assert_eq!(node.first_transiting(&ctx), Some(1));
    }

    #[test]
    fn custom_value_round_trips() {
        let mut node = StateNode::new("s");
        assert_eq!(node.custom_value(), &Value::None);
        node.set_custom_value("found");
        assert_eq!(node.custom_value(), &Value::from("found"));
    }

    #[test]
    fn telemetry_serializes_correctly() {
        let mut node = StateNode::new("s");
        node.exec_entering_action(Duration::from_millis(250));
        let json = serde_json::to_string(node.telemetry()).unwrap();
        let back: StateTelemetry = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, node.telemetry());
    }
}
