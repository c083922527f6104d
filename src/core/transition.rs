//! Transitions: condition-gated edges between states.
//!
//! A [`Transition`] composes everything the old conditional/action/monitored
//! edge variants carried: a target handle, a gating [`Condition`], an ordered
//! list of fire-once actions, and fire telemetry. Unconditional edges simply
//! carry [`Condition::always`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::condition::{Condition, ConditionCtx};
use super::state::{Action, StateId};
use super::value::Value;

/// Fire telemetry of a transition.
///
/// Updated only when the edge actually fires, never when it is merely
/// satisfied during a probe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionTelemetry {
    /// Number of times the edge fired.
    pub transit_count: u64,
    /// Clock offset of the most recent firing.
    pub last_transit_time: Option<Duration>,
    /// Free-form tag observable by collaborators.
    pub custom_value: Value,
}

/// An edge from one state to another.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cadence::core::{Condition, Layout, StateNode, Transition};
///
/// let mut layout = Layout::new();
/// let off = layout.add_state(StateNode::new("off")).unwrap();
/// let on = layout.add_state(StateNode::new("on")).unwrap();
/// layout
///     .add_transition(
///         off,
///         Transition::to(on)
///             .when(Condition::entry_duration(off, Duration::from_secs(5)))
///             .with_action(|| println!("switching on")),
///     )
///     .unwrap();
/// ```
pub struct Transition {
    target: StateId,
    condition: Condition,
    transiting_actions: Vec<Action>,
    telemetry: TransitionTelemetry,
}

impl Transition {
    /// An unconditional edge to `target`.
    pub fn to(target: StateId) -> Self {
        Self {
            target,
            condition: Condition::always(),
            transiting_actions: Vec::new(),
            telemetry: TransitionTelemetry::default(),
        }
    }

    /// Gate the edge with a condition.
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Append a fire-once action. Actions run in insertion order,
    /// synchronously, after the source state's exit and before the target's
    /// entry.
    pub fn with_action(mut self, action: impl FnMut() + 'static) -> Self {
        self.transiting_actions.push(Box::new(action));
        self
    }

    /// Tag the edge with a custom value.
    pub fn with_custom_value(mut self, value: impl Into<Value>) -> Self {
        self.telemetry.custom_value = value.into();
        self
    }

    /// The edge's destination.
    pub fn target(&self) -> StateId {
        self.target
    }

    /// Retarget the edge.
    ///
    /// Permitted while wired, but triggers no re-validation: callers
    /// retargeting before `start` must re-validate the layout themselves.
    pub fn set_target(&mut self, target: StateId) {
        self.target = target;
    }

    /// The gating condition.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Mutable access to the gating condition, for in-place retuning.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.condition
    }

    /// The edge's fire telemetry.
    pub fn telemetry(&self) -> &TransitionTelemetry {
        &self.telemetry
    }

    /// The edge's custom value.
    pub fn custom_value(&self) -> &Value {
        &self.telemetry.custom_value
    }

    /// Set the edge's custom value.
    pub fn set_custom_value(&mut self, value: impl Into<Value>) {
        self.telemetry.custom_value = value.into();
    }

    /// Whether the edge is currently satisfied. Side-effect-free: the
    /// scheduler probes many edges per tick before committing to one.
    pub fn is_transiting(&self, ctx: &ConditionCtx<'_>) -> bool {
        self.condition.evaluate(ctx)
    }

    /// Fire protocol: stamp telemetry, then run the transiting actions in
    /// insertion order. A panic in one action aborts the rest and propagates
    /// to the scheduler's caller.
    pub(crate) fn exec_transiting_action(&mut self, now: Duration) {
        self.telemetry.transit_count += 1;
        self.telemetry.last_transit_time = Some(now);
        for action in &mut self.transiting_actions {
            action();
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("condition", &self.condition)
            .field("actions", &self.transiting_actions.len())
            .field("telemetry", &self.telemetry)
            .finish()
    }
}
