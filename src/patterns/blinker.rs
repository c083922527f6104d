//! A blinking indicator built on the core engine.
//!
//! The blinker is the canonical consumer of the engine's custom-value
//! branching and live condition retuning: one machine, five states, and a
//! [`BlinkPattern`] that resolves every supported configuration down to an
//! on-dwell, an off-dwell, and an optional total deadline.

use std::time::Duration;

use thiserror::Error;

use crate::builder::{timed_transition, value_branch, StateBuilder};
use crate::core::{Clock, Condition, Layout, MonotonicClock, StateId, Transition, Value};
use crate::machine::{FiniteStateMachine, MachineError};

/// Invalid blink configurations.
#[derive(Debug, Error, PartialEq)]
pub enum BlinkError {
    #[error("cycle duration must be non-zero")]
    ZeroCycle,

    #[error("cycle count must be non-zero")]
    ZeroCount,

    #[error("percent_on must be within [0, 1], got {0}")]
    PercentOutOfRange(f64),

    #[error(transparent)]
    Machine(#[from] MachineError),
}

enum PatternKind {
    PerCycle { cycle: Duration },
    TotalWithCycle { total: Duration, cycle: Duration },
    TotalWithCount { total: Duration, count: u32 },
    Counted { cycle: Duration, count: u32 },
}

/// A named blink configuration.
///
/// Four configurations are supported, each carrying only its required keys;
/// everything else defaults: `percent_on` 0.5, `begin_on` true, `end_off`
/// true.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cadence::patterns::BlinkPattern;
///
/// let plan = BlinkPattern::total_with_count(Duration::from_secs(10), 5)
///     .percent_on(0.25)
///     .begin_on(false)
///     .resolve()
///     .unwrap();
/// assert_eq!(plan.on_time, Duration::from_millis(500));
/// assert_eq!(plan.off_time, Duration::from_millis(1500));
/// assert_eq!(plan.total, Some(Duration::from_secs(10)));
/// assert!(!plan.begin_on);
/// ```
pub struct BlinkPattern {
    kind: PatternKind,
    percent_on: f64,
    begin_on: bool,
    end_off: bool,
}

/// A resolved blink configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlinkPlan {
    /// Dwell in the lit state per cycle.
    pub on_time: Duration,
    /// Dwell in the dark state per cycle.
    pub off_time: Duration,
    /// Overall deadline; `None` blinks until told otherwise.
    pub total: Option<Duration>,
    /// Whether the first half-cycle is lit.
    pub begin_on: bool,
    /// Whether the blinker parks dark when the deadline passes.
    pub end_off: bool,
}

impl BlinkPattern {
    fn new(kind: PatternKind) -> Self {
        Self {
            kind,
            percent_on: 0.5,
            begin_on: true,
            end_off: true,
        }
    }

    /// Blink forever with a fixed cycle duration.
    pub fn per_cycle(cycle: Duration) -> Self {
        Self::new(PatternKind::PerCycle { cycle })
    }

    /// Blink with a fixed cycle duration until `total` has elapsed.
    pub fn total_with_cycle(total: Duration, cycle: Duration) -> Self {
        Self::new(PatternKind::TotalWithCycle { total, cycle })
    }

    /// Fit `count` cycles into `total`.
    pub fn total_with_count(total: Duration, count: u32) -> Self {
        Self::new(PatternKind::TotalWithCount { total, count })
    }

    /// Run exactly `count` cycles of a fixed duration.
    pub fn counted(cycle: Duration, count: u32) -> Self {
        Self::new(PatternKind::Counted { cycle, count })
    }

    /// Fraction of each cycle spent lit (default 0.5).
    pub fn percent_on(mut self, percent_on: f64) -> Self {
        self.percent_on = percent_on;
        self
    }

    /// Whether the first half-cycle is lit (default true).
    pub fn begin_on(mut self, begin_on: bool) -> Self {
        self.begin_on = begin_on;
        self
    }

    /// Whether to park dark once the deadline passes (default true).
    pub fn end_off(mut self, end_off: bool) -> Self {
        self.end_off = end_off;
        self
    }

    /// Normalize the configuration to dwell times and a deadline.
    pub fn resolve(&self) -> Result<BlinkPlan, BlinkError> {
        if !(0.0..=1.0).contains(&self.percent_on) {
            return Err(BlinkError::PercentOutOfRange(self.percent_on));
        }
        let (cycle, total) = match self.kind {
            PatternKind::PerCycle { cycle } => (cycle, None),
            PatternKind::TotalWithCycle { total, cycle } => (cycle, Some(total)),
            PatternKind::TotalWithCount { total, count } => {
                if count == 0 {
                    return Err(BlinkError::ZeroCount);
                }
                (total / count, Some(total))
            }
            PatternKind::Counted { cycle, count } => {
                if count == 0 {
                    return Err(BlinkError::ZeroCount);
                }
                (cycle, Some(cycle * count))
            }
        };
        if cycle.is_zero() {
            return Err(BlinkError::ZeroCycle);
        }
        let on_time = cycle.mul_f64(self.percent_on);
        Ok(BlinkPlan {
            on_time,
            off_time: cycle - on_time,
            total,
            begin_on: self.begin_on,
            end_off: self.end_off,
        })
    }
}

/// A two-terminal indicator light with a blinking mode.
///
/// Steady states `off`/`on` are driven externally through
/// [`turn_off`](Blinker::turn_off)/[`turn_on`](Blinker::turn_on); `blink`
/// branches through a `blink_begin` state keyed on its custom value and then
/// alternates `blink_on`/`blink_off` on retuned dwell conditions. The caller
/// polls [`track`](Blinker::track) like any other machine.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cadence::core::ManualClock;
/// use cadence::patterns::{BlinkPattern, Blinker};
///
/// let clock = ManualClock::new();
/// let mut blinker = Blinker::with_clock(clock.clone());
/// blinker.track().unwrap();
/// assert!(blinker.is_off());
///
/// blinker.blink(&BlinkPattern::per_cycle(Duration::from_secs(1))).unwrap();
/// blinker.track().unwrap();
/// assert!(blinker.is_on());
/// clock.advance(Duration::from_millis(500));
/// blinker.track().unwrap();
/// assert!(blinker.is_off());
/// ```
pub struct Blinker {
    machine: FiniteStateMachine,
    off: StateId,
    on: StateId,
    blink_begin: StateId,
    blink_on: StateId,
    blink_off: StateId,
    deadline: Option<(Duration, bool)>,
}

impl Blinker {
    /// Build a blinker on the production clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }

    /// Build a blinker on an explicit clock.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let mut layout = Layout::new();
        let off = layout
            .add_state(StateBuilder::new("off").custom_value(false).build())
            .expect("blinker wiring is fixed");
        let on = layout
            .add_state(StateBuilder::new("on").custom_value(true).build())
            .expect("blinker wiring is fixed");
        let blink_begin = layout
            .add_state(StateBuilder::new("blink_begin").build())
            .expect("blinker wiring is fixed");
        let blink_on = layout
            .add_state(StateBuilder::new("blink_on").custom_value(true).build())
            .expect("blinker wiring is fixed");
        let blink_off = layout
            .add_state(StateBuilder::new("blink_off").custom_value(false).build())
            .expect("blinker wiring is fixed");

        let wire = [
            (off, Transition::to(off).when(Condition::never())),
            (on, Transition::to(on).when(Condition::never())),
            (blink_begin, value_branch(blink_on, blink_begin, true)),
            (blink_begin, value_branch(blink_off, blink_begin, false)),
            (blink_on, timed_transition(blink_off, blink_on, Duration::ZERO)),
            (blink_off, timed_transition(blink_on, blink_off, Duration::ZERO)),
        ];
        for (from, edge) in wire {
            layout
                .add_transition(from, edge)
                .expect("blinker wiring is fixed");
        }
        layout.set_initial(off).expect("blinker wiring is fixed");

        let mut machine =
            FiniteStateMachine::with_clock(layout, clock).expect("blinker wiring is fixed");
        machine.reset();
        Self {
            machine,
            off,
            on,
            blink_begin,
            blink_on,
            blink_off,
            deadline: None,
        }
    }

    /// The underlying machine, for telemetry and inspection.
    pub fn machine(&self) -> &FiniteStateMachine {
        &self.machine
    }

    /// Whether the light currently shows lit.
    pub fn is_on(&self) -> bool {
        matches!(self.machine.current_state(), Some(id) if id == self.on || id == self.blink_on)
    }

    /// Whether the light currently shows dark.
    pub fn is_off(&self) -> bool {
        matches!(self.machine.current_state(), Some(id) if id == self.off || id == self.blink_off)
    }

    /// Whether a blink pattern is active.
    pub fn is_blinking(&self) -> bool {
        matches!(
            self.machine.current_state(),
            Some(id) if id == self.blink_begin || id == self.blink_on || id == self.blink_off
        )
    }

    /// The custom value of the current state (`Bool` for lit/dark).
    pub fn current_value(&self) -> Option<&Value> {
        self.machine
            .current_state()
            .and_then(|id| self.machine.custom_value(id))
    }

    /// Park steady-lit, cancelling any blink.
    pub fn turn_on(&mut self) -> Result<(), MachineError> {
        self.deadline = None;
        self.machine.transit_to(self.on)
    }

    /// Park steady-dark, cancelling any blink.
    pub fn turn_off(&mut self) -> Result<(), MachineError> {
        self.deadline = None;
        self.machine.transit_to(self.off)
    }

    /// Start a blink pattern.
    ///
    /// Retunes the wired dwell conditions in place, tags the branch state
    /// with the pattern's starting polarity, and transits into it; the next
    /// `track` lands in the first half-cycle.
    pub fn blink(&mut self, pattern: &BlinkPattern) -> Result<(), BlinkError> {
        let plan = pattern.resolve()?;
        self.machine
            .condition_mut(self.blink_on, 0)
            .expect("blinker wiring is fixed")
            .set_duration(plan.on_time)
            .expect("blink_on edge is duration-gated");
        self.machine
            .condition_mut(self.blink_off, 0)
            .expect("blinker wiring is fixed")
            .set_duration(plan.off_time)
            .expect("blink_off edge is duration-gated");
        self.machine.set_custom_value(self.blink_begin, plan.begin_on)?;
        self.machine.transit_to(self.blink_begin)?;
        self.deadline = plan.total.map(|t| (self.machine.now() + t, plan.end_off));
        Ok(())
    }

    /// One poll: enforce the pattern deadline, then tick the machine.
    pub fn track(&mut self) -> Result<bool, MachineError> {
        if let Some((deadline, end_off)) = self.deadline {
            if self.machine.now() >= deadline {
                self.deadline = None;
                let park = if end_off { self.off } else { self.on };
                self.machine.transit_to(park)?;
                return Ok(true);
            }
        }
        self.machine.track()
    }
}

impl Default for Blinker {
    fn default() -> Self {
        Self::new()
    }
}
