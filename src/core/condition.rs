//! Boolean conditions gating transitions.
//!
//! A [`Condition`] is a predicate tree: leaves test time, counters, values,
//! or an external probe; composites combine children with AND/OR/NOR. The
//! whole hierarchy is one closed enum behind constructor functions, with an
//! `inverse` flag at every node. Conditions never own states: the ones bound
//! to a monitored state hold a [`StateId`] handle and read telemetry through
//! a borrowed [`ConditionCtx`] at evaluation time, so evaluating is always
//! side-effect-free.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::state::{StateId, StateNode, StateTelemetry};
use super::value::Value;

/// Errors from mutating a wired condition of the wrong kind.
///
/// Thresholds may be retuned while a condition is wired into a live machine
/// (a blinker retunes its dwell durations on every `blink` call), but only on
/// the kind that carries them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("condition is not duration-based")]
    NotDurationBased,

    #[error("condition is not entry-count-based")]
    NotCountBased,

    #[error("condition is not value-based")]
    NotValueBased,

    #[error("condition is not a composite")]
    NotComposite,
}

/// Borrowed evaluation context: the state arena plus the tick's time reading.
///
/// The scheduler builds one per tick, reading the clock once, so every
/// condition evaluated within a tick sees the same `now`.
pub struct ConditionCtx<'a> {
    states: &'a [StateNode],
    now: Duration,
}

impl<'a> ConditionCtx<'a> {
    /// Build a context over a state arena at a given time reading.
    pub fn new(states: &'a [StateNode], now: Duration) -> Self {
        Self { states, now }
    }

    /// The time reading all conditions in this context evaluate against.
    pub fn now(&self) -> Duration {
        self.now
    }

    fn telemetry(&self, id: StateId) -> Option<&StateTelemetry> {
        self.states.get(id.index()).map(|s| s.telemetry())
    }
}

enum ConditionKind {
    Always,
    Value {
        value: Value,
        expected: Value,
    },
    Predicate(Box<dyn Fn() -> bool>),
    EntryDuration {
        state: StateId,
        duration: Duration,
    },
    EntryCount {
        state: StateId,
        expected: u64,
        reference: u64,
        auto_reset: bool,
    },
    StateValue {
        state: StateId,
        expected: Value,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    NoneOf(Vec<Condition>),
}

/// A composable boolean predicate, optionally inverted.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cadence::core::{Condition, ConditionCtx, StateNode};
///
/// let states = vec![StateNode::new("idle")];
/// let ctx = ConditionCtx::new(&states, Duration::ZERO);
///
/// assert!(Condition::always().evaluate(&ctx));
/// assert!(!Condition::never().evaluate(&ctx));
/// assert!(Condition::all(vec![]).evaluate(&ctx)); // vacuous truth
/// assert!(!Condition::any(vec![]).evaluate(&ctx)); // vacuous falsity
/// ```
pub struct Condition {
    kind: ConditionKind,
    inverse: bool,
}

impl Condition {
    fn leaf(kind: ConditionKind) -> Self {
        Self {
            kind,
            inverse: false,
        }
    }

    /// A condition that always holds.
    pub fn always() -> Self {
        Self::leaf(ConditionKind::Always)
    }

    /// A condition that never holds.
    ///
    /// Useful for states whose only auto-edge must stay dormant, with
    /// movement driven externally through
    /// [`transit_to`](crate::machine::FiniteStateMachine::transit_to).
    pub fn never() -> Self {
        Self::always().inverted()
    }

    /// Holds when `value == expected`.
    pub fn value(value: impl Into<Value>, expected: impl Into<Value>) -> Self {
        Self::leaf(ConditionKind::Value {
            value: value.into(),
            expected: expected.into(),
        })
    }

    /// Holds when the probe returns true.
    ///
    /// The extension point for collaborator-owned signals such as a distance
    /// sensor or a remote-control key. The probe must not mutate machine
    /// state; it is called on every evaluation.
    pub fn predicate(probe: impl Fn() -> bool + 'static) -> Self {
        Self::leaf(ConditionKind::Predicate(Box::new(probe)))
    }

    /// Holds once `state` has dwelled at least `duration` since its last
    /// entry. Never holds for a state that was never entered.
    pub fn entry_duration(state: StateId, duration: Duration) -> Self {
        Self::leaf(ConditionKind::EntryDuration { state, duration })
    }

    /// Holds once `state` has been entered at least `expected` more times
    /// than the rebased reference count.
    ///
    /// The reference starts at zero; [`reset_count`](Self::reset_count)
    /// rebases it to the state's live count when `auto_reset` is set.
    pub fn entry_count(state: StateId, expected: u64, auto_reset: bool) -> Self {
        Self::leaf(ConditionKind::EntryCount {
            state,
            expected,
            reference: 0,
            auto_reset,
        })
    }

    /// Holds while `state`'s custom value equals `expected`.
    pub fn state_value(state: StateId, expected: impl Into<Value>) -> Self {
        Self::leaf(ConditionKind::StateValue {
            state,
            expected: expected.into(),
        })
    }

    /// Logical AND over children. Empty is vacuously true.
    pub fn all(children: Vec<Condition>) -> Self {
        Self::leaf(ConditionKind::All(children))
    }

    /// Logical OR over children. Empty is vacuously false.
    pub fn any(children: Vec<Condition>) -> Self {
        Self::leaf(ConditionKind::Any(children))
    }

    /// Logical NOR over children. Empty is vacuously true.
    pub fn none_of(children: Vec<Condition>) -> Self {
        Self::leaf(ConditionKind::NoneOf(children))
    }

    /// Flip the inversion flag.
    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    /// Whether this condition is inverted.
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// The monitored state this condition is bound to, if any.
    pub fn monitored_state(&self) -> Option<StateId> {
        match self.kind {
            ConditionKind::EntryDuration { state, .. }
            | ConditionKind::EntryCount { state, .. }
            | ConditionKind::StateValue { state, .. } => Some(state),
            _ => None,
        }
    }

    /// Evaluate the predicate tree against a context.
    ///
    /// Applies each node's own inverse flag: composites combine their
    /// children's `evaluate`, not their raw results.
    pub fn evaluate(&self, ctx: &ConditionCtx<'_>) -> bool {
        let raw = match &self.kind {
            ConditionKind::Always => true,
            ConditionKind::Value { value, expected } => value == expected,
            ConditionKind::Predicate(probe) => probe(),
            ConditionKind::EntryDuration { state, duration } => ctx
                .telemetry(*state)
                .and_then(|t| t.last_entry_time)
                .and_then(|entered| ctx.now.checked_sub(entered))
                .is_some_and(|dwell| dwell >= *duration),
            ConditionKind::EntryCount {
                state,
                expected,
                reference,
                ..
            } => ctx
                .telemetry(*state)
                .is_some_and(|t| t.entry_count.saturating_sub(*reference) >= *expected),
            ConditionKind::StateValue { state, expected } => ctx
                .telemetry(*state)
                .is_some_and(|t| &t.custom_value == expected),
            ConditionKind::All(children) => children.iter().all(|c| c.evaluate(ctx)),
            ConditionKind::Any(children) => children.iter().any(|c| c.evaluate(ctx)),
            ConditionKind::NoneOf(children) => !children.iter().any(|c| c.evaluate(ctx)),
        };
        if self.inverse {
            !raw
        } else {
            raw
        }
    }

    /// Retune a duration threshold in place.
    pub fn set_duration(&mut self, duration: Duration) -> Result<(), ConditionError> {
        match &mut self.kind {
            ConditionKind::EntryDuration { duration: d, .. } => {
                *d = duration;
                Ok(())
            }
            _ => Err(ConditionError::NotDurationBased),
        }
    }

    /// Retune an entry-count threshold in place.
    pub fn set_expected_count(&mut self, expected: u64) -> Result<(), ConditionError> {
        match &mut self.kind {
            ConditionKind::EntryCount { expected: e, .. } => {
                *e = expected;
                Ok(())
            }
            _ => Err(ConditionError::NotCountBased),
        }
    }

    /// Replace the expected value of a value-based condition.
    pub fn set_expected_value(&mut self, value: impl Into<Value>) -> Result<(), ConditionError> {
        match &mut self.kind {
            ConditionKind::Value { expected, .. } | ConditionKind::StateValue { expected, .. } => {
                *expected = value.into();
                Ok(())
            }
            _ => Err(ConditionError::NotValueBased),
        }
    }

    /// Rebase an entry-count condition's reference to the monitored state's
    /// live count — only when the condition was built with `auto_reset`.
    pub fn reset_count(&mut self, ctx: &ConditionCtx<'_>) -> Result<(), ConditionError> {
        match &mut self.kind {
            ConditionKind::EntryCount {
                state,
                reference,
                auto_reset,
                ..
            } => {
                if *auto_reset {
                    if let Some(t) = ctx.telemetry(*state) {
                        *reference = t.entry_count;
                    }
                }
                Ok(())
            }
            _ => Err(ConditionError::NotCountBased),
        }
    }

    /// Append a child to a composite condition.
    pub fn add_condition(&mut self, condition: Condition) -> Result<(), ConditionError> {
        match &mut self.kind {
            ConditionKind::All(children)
            | ConditionKind::Any(children)
            | ConditionKind::NoneOf(children) => {
                children.push(condition);
                Ok(())
            }
            _ => Err(ConditionError::NotComposite),
        }
    }

    /// Walk every state handle referenced anywhere in the tree.
    pub(crate) fn for_each_state(&self, visit: &mut impl FnMut(StateId)) {
        match &self.kind {
            ConditionKind::EntryDuration { state, .. }
            | ConditionKind::EntryCount { state, .. }
            | ConditionKind::StateValue { state, .. } => visit(*state),
            ConditionKind::All(children)
            | ConditionKind::Any(children)
            | ConditionKind::NoneOf(children) => {
                for child in children {
                    child.for_each_state(visit);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.kind {
            ConditionKind::Always => "Always",
            ConditionKind::Value { .. } => "Value",
            ConditionKind::Predicate(_) => "Predicate",
            ConditionKind::EntryDuration { .. } => "EntryDuration",
            ConditionKind::EntryCount { .. } => "EntryCount",
            ConditionKind::StateValue { .. } => "StateValue",
            ConditionKind::All(_) => "All",
            ConditionKind::Any(_) => "Any",
            ConditionKind::NoneOf(_) => "NoneOf",
        };
        f.debug_struct("Condition")
            .field("kind", &name)
            .field("inverse", &self.inverse)
            .finish()
    }
}
