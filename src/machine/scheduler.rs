//! The polled scheduler driving a state graph.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    Clock, Condition, Layout, LayoutError, MonotonicClock, StateId, StateNode, StateTelemetry,
    TransitionTelemetry, Value,
};

use super::history::{TransitionLog, TransitionRecord};

/// Lifecycle of the scheduler itself.
///
/// `Uninitialized → Idle → Running ⇄ Idle`, with `Running →
/// TerminalReached` once a terminal state is entered. Only
/// [`reset`](FiniteStateMachine::reset) leaves `TerminalReached`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalState {
    /// Constructed, never reset: no current state yet.
    Uninitialized,
    /// A current state is set but the machine is not being driven.
    Idle,
    /// Inside a `start` loop.
    Running,
    /// A terminal state was entered; automatic ticking has halted.
    TerminalReached,
}

/// Scheduler-level errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    /// The layout failed validation at machine construction.
    #[error("invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// A state handle from another layout was passed in.
    #[error("state handle {0} does not belong to this machine")]
    UnknownState(usize),

    /// `track` or `start(reset = false)` on a machine that was never reset.
    /// A configuration error: call `reset()` (or `start` with reset) first.
    #[error("machine has no current state; reset it first")]
    NotInitialized,
}

/// A finite state machine: an owned, validated [`Layout`] plus the polling
/// scheduler that drives it.
///
/// The machine exclusively owns its layout and, transitively, every state,
/// transition, and condition reachable from it. It is single-threaded and
/// cooperative: exactly one [`track`](Self::track) runs at a time and runs to
/// completion.
///
/// Action callbacks are not isolated: a panic inside one propagates straight
/// out of `track`/`start` with no rollback of the already-completed half of a
/// transition. A machine caught mid-transition that way still points at the
/// new state; callers needing recovery wrap the call and
/// [`reset`](Self::reset) back to a known-good state.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cadence::core::{Condition, Layout, ManualClock, StateNode, Transition};
/// use cadence::machine::FiniteStateMachine;
///
/// let mut layout = Layout::new();
/// let off = layout.add_state(StateNode::new("off")).unwrap();
/// let on = layout.add_state(StateNode::new("on")).unwrap();
/// layout
///     .add_transition(
///         off,
///         Transition::to(on).when(Condition::entry_duration(off, Duration::from_secs(5))),
///     )
///     .unwrap();
/// layout.add_transition(on, Transition::to(on).when(Condition::never())).unwrap();
/// layout.set_initial(off).unwrap();
///
/// let clock = ManualClock::new();
/// let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
/// machine.reset();
/// machine.track().unwrap(); // enters off at t = 0
/// clock.advance(Duration::from_secs(5));
/// machine.track().unwrap(); // dwell reached: off -> on
/// assert_eq!(machine.current_state(), Some(on));
/// ```
pub struct FiniteStateMachine {
    layout: Layout,
    clock: Box<dyn Clock>,
    current: Option<StateId>,
    operational: OperationalState,
    entry_pending: bool,
    ticks: u64,
    log: TransitionLog,
}

impl core::fmt::Debug for FiniteStateMachine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FiniteStateMachine")
            .field("current", &self.current)
            .field("operational", &self.operational)
            .field("entry_pending", &self.entry_pending)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl FiniteStateMachine {
    /// Build a machine over a validated layout with the production clock.
    pub fn new(layout: Layout) -> Result<Self, MachineError> {
        Self::with_clock(layout, MonotonicClock::new())
    }

    /// Build a machine with an explicit clock (tests pass a
    /// [`ManualClock`](crate::core::ManualClock)).
    ///
    /// Construction fails if the layout is not valid; from here on the graph
    /// shape is immutable.
    pub fn with_clock(layout: Layout, clock: impl Clock + 'static) -> Result<Self, MachineError> {
        layout.validate()?;
        Ok(Self {
            layout,
            clock: Box::new(clock),
            current: None,
            operational: OperationalState::Uninitialized,
            entry_pending: false,
            ticks: 0,
            log: TransitionLog::new(),
        })
    }

    /// The owned layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Handle of the current applicative state, if the machine was reset.
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    /// The current applicative state node.
    pub fn current_node(&self) -> Option<&StateNode> {
        self.current.map(|id| self.layout.node(id))
    }

    /// Name of the current applicative state.
    pub fn current_state_name(&self) -> Option<&str> {
        self.current_node().map(|n| n.name())
    }

    /// The scheduler's own lifecycle state.
    pub fn operational_state(&self) -> OperationalState {
        self.operational
    }

    /// Number of completed ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The log of fired transitions.
    pub fn transition_log(&self) -> &TransitionLog {
        &self.log
    }

    /// Current reading of the machine clock.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Force the machine to `Idle` and snap back to the layout's initial
    /// state, discarding any in-progress transition. The initial state's
    /// entering actions run on the next `start` or `track`.
    pub fn reset(&mut self) {
        self.operational = OperationalState::Idle;
        self.current = self.layout.initial();
        self.entry_pending = true;
    }

    /// Set the machine `Idle` without touching the current state.
    pub fn stop(&mut self) {
        self.operational = OperationalState::Idle;
    }

    /// One scheduler tick.
    ///
    /// Evaluates the current state's transitions in priority order. If one
    /// is satisfied, fires it with the fixed protocol — exiting actions of
    /// the old state, the edge's transiting actions, entering actions of the
    /// new state — and that order is load-bearing: hardware released by the
    /// old state must be free before the edge acts, and the edge must finish
    /// before the new state claims it. Otherwise runs the current state's
    /// in-state actions.
    ///
    /// Returns `Ok(false)` once the current state is terminal (and flips the
    /// machine to `TerminalReached`), `Ok(true)` while ticking may continue.
    pub fn track(&mut self) -> Result<bool, MachineError> {
        let current = self.current.ok_or(MachineError::NotInitialized)?;
        let now = self.clock.now();
        if self.entry_pending {
            self.entry_pending = false;
            self.layout.node_mut(current).exec_entering_action(now);
        }
        self.ticks += 1;

        let satisfied = {
            let ctx = self.layout.ctx(now);
            self.layout.node(current).first_transiting(&ctx)
        };

        let resting = match satisfied {
            Some(index) => self.transit_by(current, index, now),
            None => {
                self.layout.node_mut(current).exec_in_state_action();
                current
            }
        };

        if self.layout.node(resting).is_terminal() {
            self.operational = OperationalState::TerminalReached;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    /// Fire the `index`-th transition out of `from`: exit, transit, enter.
    fn transit_by(&mut self, from: StateId, index: usize, now: Duration) -> StateId {
        let target = self.layout.node(from).transitions()[index].target();
        self.layout.node_mut(from).exec_exiting_action(now);
        if let Some(edge) = self.layout.node_mut(from).transition_mut(index) {
            edge.exec_transiting_action(now);
        }
        self.current = Some(target);
        self.log.record(TransitionRecord {
            from,
            to: target,
            at: Utc::now(),
            tick: self.ticks,
        });
        self.layout.node_mut(target).exec_entering_action(now);
        target
    }

    /// Force a transition to `target`, outside any wired edge.
    ///
    /// Runs the current state's exiting actions (unless the machine was
    /// reset and never entered it) and the target's entering actions. The
    /// collaborator-facing equivalent of a remote-control override.
    pub fn transit_to(&mut self, target: StateId) -> Result<(), MachineError> {
        if target.index() >= self.layout.len() {
            return Err(MachineError::UnknownState(target.index()));
        }
        let now = self.clock.now();
        if let Some(current) = self.current {
            if self.entry_pending {
                self.entry_pending = false;
            } else {
                self.layout.node_mut(current).exec_exiting_action(now);
            }
            self.log.record(TransitionRecord {
                from: current,
                to: target,
                at: Utc::now(),
                tick: self.ticks,
            });
        }
        self.current = Some(target);
        self.layout.node_mut(target).exec_entering_action(now);
        if self.layout.node(target).is_terminal() {
            self.operational = OperationalState::TerminalReached;
        }
        Ok(())
    }

    /// Run the machine: optionally reset, mark `Running`, run the current
    /// state's entering actions once, then call [`track`](Self::track) in a
    /// busy cooperative loop until a terminal state halts it or the time
    /// budget runs out.
    ///
    /// This blocks the calling thread; the core imposes no pacing. The
    /// budget is a best-effort wall-clock cutoff checked between ticks, not
    /// preemptively. `None` means unbounded.
    pub fn start(
        &mut self,
        reset: bool,
        time_budget: Option<Duration>,
    ) -> Result<(), MachineError> {
        if reset {
            self.reset();
        }
        let current = self.current.ok_or(MachineError::NotInitialized)?;
        self.operational = OperationalState::Running;
        let started = self.clock.now();
        self.entry_pending = false;
        self.layout.node_mut(current).exec_entering_action(started);
        loop {
            if !self.track()? {
                break;
            }
            if let Some(budget) = time_budget {
                if self.clock.now().saturating_sub(started) >= budget {
                    self.stop();
                    break;
                }
            }
        }
        Ok(())
    }

    /// A state's dwell telemetry.
    pub fn state_telemetry(&self, state: StateId) -> Option<&StateTelemetry> {
        self.layout.state(state).map(|s| s.telemetry())
    }

    /// A wired transition's fire telemetry.
    pub fn transition_telemetry(
        &self,
        state: StateId,
        index: usize,
    ) -> Option<&TransitionTelemetry> {
        self.layout
            .state(state)
            .and_then(|s| s.transitions().get(index))
            .map(|t| t.telemetry())
    }

    /// A state's custom value.
    pub fn custom_value(&self, state: StateId) -> Option<&Value> {
        self.layout.state(state).map(|s| s.custom_value())
    }

    /// Write a state's custom value — the sanctioned external-input channel.
    pub fn set_custom_value(
        &mut self,
        state: StateId,
        value: impl Into<Value>,
    ) -> Result<(), MachineError> {
        self.layout
            .state_mut(state)
            .ok_or(MachineError::UnknownState(state.index()))?
            .set_custom_value(value);
        Ok(())
    }

    /// Mutable access to a wired condition, for sanctioned in-place retuning
    /// (thresholds, expected values). The graph shape stays fixed.
    pub fn condition_mut(&mut self, state: StateId, index: usize) -> Option<&mut Condition> {
        self.layout
            .state_mut(state)
            .and_then(|s| s.transition_mut(index))
            .map(|t| t.condition_mut())
    }

    /// Zero a state's entry counter.
    pub fn reset_entry_count(&mut self, state: StateId) -> Result<(), MachineError> {
        self.layout
            .state_mut(state)
            .ok_or(MachineError::UnknownState(state.index()))?
            .reset_entry_count();
        Ok(())
    }

    /// Clear a state's entry/exit timestamps.
    pub fn reset_last_times(&mut self, state: StateId) -> Result<(), MachineError> {
        self.layout
            .state_mut(state)
            .ok_or(MachineError::UnknownState(state.index()))?
            .reset_last_times();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, StateParams, Transition};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn node(name: &str) -> StateNode {
        StateNode::new(name)
    }

    fn terminal(name: &str) -> StateNode {
        StateNode::with_params(
            name,
            StateParams {
                terminal: true,
                ..StateParams::default()
            },
        )
    }

    /// off/on pair where movement only happens through transit_to.
    fn manual_pair() -> (FiniteStateMachine, ManualClock, StateId, StateId) {
        let mut layout = Layout::new();
        let off = layout.add_state(node("off")).unwrap();
        let on = layout.add_state(node("on")).unwrap();
        layout
            .add_transition(off, Transition::to(off).when(Condition::never()))
            .unwrap();
        layout
            .add_transition(on, Transition::to(on).when(Condition::never()))
            .unwrap();
        layout.set_initial(off).unwrap();
        let clock = ManualClock::new();
        let machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
        (machine, clock, off, on)
    }

    #[test]
    fn construction_rejects_invalid_layouts() {
        let mut layout = Layout::new();
        layout.add_state(node("lonely")).unwrap();
        let err = FiniteStateMachine::new(layout).unwrap_err();
        assert!(matches!(err, MachineError::InvalidLayout(_)));
    }

    #[test]
    fn new_machine_is_uninitialized() {
        let (machine, _, _, _) = manual_pair();
        assert_eq!(machine.operational_state(), OperationalState::Uninitialized);
        assert_eq!(machine.current_state(), None);
    }

    #[test]
    fn track_before_reset_is_a_configuration_error() {
        let (mut machine, _, _, _) = manual_pair();
        assert_eq!(machine.track(), Err(MachineError::NotInitialized));
    }

    #[test]
    fn reset_snaps_to_initial_and_idle() {
        let (mut machine, _, off, _) = manual_pair();
        machine.reset();
        assert_eq!(machine.operational_state(), OperationalState::Idle);
        assert_eq!(machine.current_state(), Some(off));
        assert_eq!(machine.current_state_name(), Some("off"));
    }

    #[test]
    fn first_track_after_reset_runs_entering_actions_once() {
        let mut layout = Layout::new();
        let entered = Rc::new(Cell::new(0));
        let mut s = node("s");
        let e = Rc::clone(&entered);
        s.add_entering_action(move || e.set(e.get() + 1));
        let s = layout.add_state(s).unwrap();
        layout
            .add_transition(s, Transition::to(s).when(Condition::never()))
            .unwrap();
        layout.set_initial(s).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        machine.track().unwrap();
        machine.track().unwrap();
        assert_eq!(entered.get(), 1);
    }

    // P1: the earlier-added transition wins and the later one's action
    // never executes.
    #[test]
    fn simultaneous_transitions_fire_by_priority() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let mut layout = Layout::new();
        let a = layout.add_state(node("a")).unwrap();
        let b = layout.add_state(terminal("b")).unwrap();
        let c = layout.add_state(terminal("c")).unwrap();
        let (first, second) = (Rc::clone(&fired), Rc::clone(&fired));
        layout
            .add_transition(
                a,
                Transition::to(b).with_action(move || first.borrow_mut().push("t1")),
            )
            .unwrap();
        layout
            .add_transition(
                a,
                Transition::to(c).with_action(move || second.borrow_mut().push("t2")),
            )
            .unwrap();
        layout.set_initial(a).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(b));
        assert_eq!(*fired.borrow(), vec!["t1"]);
        assert_eq!(machine.transition_telemetry(a, 0).unwrap().transit_count, 1);
        assert_eq!(machine.transition_telemetry(a, 1).unwrap().transit_count, 0);
    }

    // Scenario B: duration-gated edge flips exactly at the threshold.
    #[test]
    fn dwell_gated_edge_fires_at_threshold() {
        let mut layout = Layout::new();
        let off = layout.add_state(node("off_duration")).unwrap();
        let entered_on = Rc::new(Cell::new(0));
        let mut on_node = terminal("on");
        let e = Rc::clone(&entered_on);
        on_node.add_entering_action(move || e.set(e.get() + 1));
        let on = layout.add_state(on_node).unwrap();
        layout
            .add_transition(
                off,
                Transition::to(on).when(Condition::entry_duration(off, secs(5))),
            )
            .unwrap();
        layout.set_initial(off).unwrap();
        let clock = ManualClock::new();
        let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
        machine.reset();
        machine.track().unwrap(); // enters off at t = 0
        clock.set(Duration::from_millis(4900));
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(off));
        clock.set(Duration::from_millis(5100));
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(on));
        assert_eq!(entered_on.get(), 1);
    }

    // P2: many in-state ticks before the threshold change nothing.
    #[test]
    fn in_state_ticks_do_not_advance_dwell() {
        let mut layout = Layout::new();
        let s = layout.add_state(node("s")).unwrap();
        let t = layout.add_state(terminal("t")).unwrap();
        layout
            .add_transition(s, Transition::to(t).when(Condition::entry_duration(s, secs(10))))
            .unwrap();
        layout.set_initial(s).unwrap();
        let clock = ManualClock::new();
        let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
        machine.reset();
        for ms in [0u64, 1000, 2000, 9999] {
            clock.set(Duration::from_millis(ms));
            assert!(machine.track().unwrap());
            assert_eq!(machine.current_state(), Some(s));
        }
        clock.set(secs(10));
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(t));
    }

    // P3: entry count tracks entries exactly, reset rebases to zero.
    #[test]
    fn entry_count_follows_reentries() {
        let (mut machine, _, off, on) = manual_pair();
        machine.reset();
        machine.track().unwrap();
        for _ in 0..3 {
            machine.transit_to(on).unwrap();
            machine.transit_to(off).unwrap();
        }
        assert_eq!(machine.state_telemetry(on).unwrap().entry_count, 3);
        assert_eq!(machine.state_telemetry(off).unwrap().entry_count, 4);
        machine.reset_entry_count(on).unwrap();
        assert_eq!(machine.state_telemetry(on).unwrap().entry_count, 0);
        machine.transit_to(on).unwrap();
        assert_eq!(machine.state_telemetry(on).unwrap().entry_count, 1);
    }

    // P4: terminal halts ticking; only reset leaves TerminalReached.
    #[test]
    fn terminal_state_halts_tracking() {
        let mut layout = Layout::new();
        let a = layout.add_state(node("a")).unwrap();
        let end = layout.add_state(terminal("end")).unwrap();
        layout.add_transition(a, Transition::to(end)).unwrap();
        layout.set_initial(a).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        assert!(!machine.track().unwrap());
        assert_eq!(
            machine.operational_state(),
            OperationalState::TerminalReached
        );
        assert_eq!(machine.current_state(), Some(end));
        machine.reset();
        assert_eq!(machine.operational_state(), OperationalState::Idle);
        assert_eq!(machine.current_state(), Some(a));
    }

    #[test]
    fn start_without_reset_reruns_terminal_entering_only() {
        let mut layout = Layout::new();
        let a = layout.add_state(node("a")).unwrap();
        let entered = Rc::new(Cell::new(0));
        let mut end_node = terminal("end");
        let e = Rc::clone(&entered);
        end_node.add_entering_action(move || e.set(e.get() + 1));
        let end = layout.add_state(end_node).unwrap();
        layout.add_transition(a, Transition::to(end)).unwrap();
        layout.set_initial(a).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.start(true, None).unwrap();
        assert_eq!(
            machine.operational_state(),
            OperationalState::TerminalReached
        );
        assert_eq!(entered.get(), 1);
        // Without a reset the machine re-runs the terminal state's entering
        // actions and immediately halts again.
        machine.start(false, None).unwrap();
        assert_eq!(entered.get(), 2);
        assert_eq!(
            machine.operational_state(),
            OperationalState::TerminalReached
        );
        assert_eq!(machine.current_state(), Some(end));
    }

    // Scenario A: a state parked behind a never-firing self-loop re-runs
    // its in-state action on every tick.
    #[test]
    fn parked_state_reruns_in_state_action() {
        let mut layout = Layout::new();
        let ticks = Rc::new(Cell::new(0));
        let mut on_node = node("on");
        let t = Rc::clone(&ticks);
        on_node.add_in_state_action(move || t.set(t.get() + 1));
        let on = layout.add_state(on_node).unwrap();
        let off = layout.add_state(node("off")).unwrap();
        layout
            .add_transition(off, Transition::to(off).when(Condition::never()))
            .unwrap();
        layout
            .add_transition(on, Transition::to(on).when(Condition::never()))
            .unwrap();
        layout.set_initial(off).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        machine.track().unwrap();
        machine.transit_to(on).unwrap();
        machine.track().unwrap();
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(on));
        assert_eq!(ticks.get(), 2);
    }

    // Scenario C: red(10s) -> green(10s) -> yellow(5s) -> red, checked at
    // t = 26: one full cycle done, second green not yet due.
    #[test]
    fn traffic_light_cycles_on_schedule() {
        let mut layout = Layout::new();
        let red = layout.add_state(node("red")).unwrap();
        let green = layout.add_state(node("green")).unwrap();
        let yellow = layout.add_state(node("yellow")).unwrap();
        layout
            .add_transition(
                red,
                Transition::to(green).when(Condition::entry_duration(red, secs(10))),
            )
            .unwrap();
        layout
            .add_transition(
                green,
                Transition::to(yellow).when(Condition::entry_duration(green, secs(10))),
            )
            .unwrap();
        layout
            .add_transition(
                yellow,
                Transition::to(red).when(Condition::entry_duration(yellow, secs(5))),
            )
            .unwrap();
        layout.set_initial(red).unwrap();
        let clock = ManualClock::new();
        let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
        machine.reset();
        let mut seen = Vec::new();
        for ms in (0..=26_000u64).step_by(100) {
            clock.set(Duration::from_millis(ms));
            machine.track().unwrap();
            seen.push(machine.current_state().unwrap());
        }
        assert_eq!(machine.current_state(), Some(red));
        assert_eq!(machine.transition_log().path(), vec![red, green, yellow, red]);
        // Dwell boundaries: green from t=10, yellow from t=20, red from t=25.
        assert!(seen.contains(&green));
        assert!(seen.contains(&yellow));
    }

    // Scenario D: a branch state keyed on its own custom value.
    #[test]
    fn value_branch_picks_the_tagged_edge() {
        let mut layout = Layout::new();
        let begin = layout.add_state(node("blink_begin")).unwrap();
        let on = layout.add_state(terminal("blink_on")).unwrap();
        let off = layout.add_state(terminal("blink_off")).unwrap();
        layout
            .add_transition(begin, Transition::to(on).when(Condition::state_value(begin, true)))
            .unwrap();
        layout
            .add_transition(
                begin,
                Transition::to(off).when(Condition::state_value(begin, false)),
            )
            .unwrap();
        layout.set_initial(begin).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        machine.set_custom_value(begin, true).unwrap();
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(on));
    }

    #[test]
    fn tick_order_is_exit_transit_enter() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layout = Layout::new();
        let mut a_node = node("a");
        let l = Rc::clone(&log);
        a_node.add_exiting_action(move || l.borrow_mut().push("exit-a"));
        let a = layout.add_state(a_node).unwrap();
        let mut b_node = terminal("b");
        let l = Rc::clone(&log);
        b_node.add_entering_action(move || l.borrow_mut().push("enter-b"));
        let b = layout.add_state(b_node).unwrap();
        let l = Rc::clone(&log);
        layout
            .add_transition(
                a,
                Transition::to(b).with_action(move || l.borrow_mut().push("transit")),
            )
            .unwrap();
        layout.set_initial(a).unwrap();
        let mut machine = FiniteStateMachine::with_clock(layout, ManualClock::new()).unwrap();
        machine.reset();
        machine.track().unwrap();
        assert_eq!(*log.borrow(), vec!["exit-a", "transit", "enter-b"]);
    }

    #[test]
    fn stop_keeps_the_current_state() {
        let (mut machine, _, _, on) = manual_pair();
        machine.reset();
        machine.track().unwrap();
        machine.transit_to(on).unwrap();
        machine.stop();
        assert_eq!(machine.operational_state(), OperationalState::Idle);
        assert_eq!(machine.current_state(), Some(on));
    }

    #[test]
    fn transit_to_rejects_foreign_handles() {
        let (mut machine, _, _, _) = manual_pair();
        machine.reset();
        assert_eq!(
            machine.transit_to(StateId(99)),
            Err(MachineError::UnknownState(99))
        );
    }

    #[test]
    fn start_respects_its_time_budget() {
        // Real clock: a cycle that can never finish, bounded by the budget.
        let mut layout = Layout::new();
        let a = layout.add_state(node("a")).unwrap();
        let b = layout.add_state(node("b")).unwrap();
        layout
            .add_transition(
                a,
                Transition::to(b).when(Condition::entry_duration(a, Duration::from_millis(5))),
            )
            .unwrap();
        layout
            .add_transition(
                b,
                Transition::to(a).when(Condition::entry_duration(b, Duration::from_millis(5))),
            )
            .unwrap();
        layout.set_initial(a).unwrap();
        let mut machine = FiniteStateMachine::new(layout).unwrap();
        machine.start(true, Some(Duration::from_millis(40))).unwrap();
        assert_eq!(machine.operational_state(), OperationalState::Idle);
        assert!(machine.ticks() > 0);
        assert!(!machine.transition_log().is_empty());
    }

    #[test]
    fn nested_machine_ticks_inside_a_state() {
        // A task state whose in-state action drives an inner machine by
        // composition; the outer scheduler never sees the inner graph.
        let mut inner_layout = Layout::new();
        let ia = inner_layout.add_state(node("inner_a")).unwrap();
        let ib = inner_layout.add_state(terminal("inner_b")).unwrap();
        inner_layout.add_transition(ia, Transition::to(ib)).unwrap();
        inner_layout.set_initial(ia).unwrap();
        let mut inner =
            FiniteStateMachine::with_clock(inner_layout, ManualClock::new()).unwrap();
        inner.reset();
        let inner = Rc::new(RefCell::new(inner));

        let mut outer_layout = Layout::new();
        let mut task = node("task");
        let driven = Rc::clone(&inner);
        task.add_in_state_action(move || {
            let _ = driven.borrow_mut().track();
        });
        let task = outer_layout.add_state(task).unwrap();
        outer_layout
            .add_transition(task, Transition::to(task).when(Condition::never()))
            .unwrap();
        outer_layout.set_initial(task).unwrap();
        let mut outer =
            FiniteStateMachine::with_clock(outer_layout, ManualClock::new()).unwrap();
        outer.reset();
        outer.track().unwrap();
        assert_eq!(
            inner.borrow().operational_state(),
            OperationalState::TerminalReached
        );
        assert_eq!(inner.borrow().current_state_name(), Some("inner_b"));
    }

    #[test]
    fn condition_mut_retunes_a_wired_edge() {
        let mut layout = Layout::new();
        let a = layout.add_state(node("a")).unwrap();
        let b = layout.add_state(terminal("b")).unwrap();
        layout
            .add_transition(a, Transition::to(b).when(Condition::entry_duration(a, secs(60))))
            .unwrap();
        layout.set_initial(a).unwrap();
        let clock = ManualClock::new();
        let mut machine = FiniteStateMachine::with_clock(layout, clock.clone()).unwrap();
        machine.reset();
        machine.track().unwrap();
        machine
            .condition_mut(a, 0)
            .unwrap()
            .set_duration(secs(1))
            .unwrap();
        clock.set(secs(2));
        machine.track().unwrap();
        assert_eq!(machine.current_state(), Some(b));
    }
}
