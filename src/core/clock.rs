//! Monotonic time sources for dwell-time measurement.
//!
//! The scheduler reads time once per tick through the [`Clock`] trait and
//! passes the reading down to condition evaluation. Production machines use
//! [`MonotonicClock`]; tests drive time by hand with [`ManualClock`] so
//! duration-gated transitions become deterministic.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now()` returns the elapsed time since an arbitrary, fixed origin. Only
/// differences between readings are meaningful; readings never decrease.
pub trait Clock {
    /// Current offset from the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock-backed monotonic time, anchored at construction.
///
/// # Example
///
/// ```rust
/// use cadence::core::{Clock, MonotonicClock};
///
/// let clock = MonotonicClock::new();
/// let a = clock.now();
/// let b = clock.now();
/// assert!(b >= a);
/// ```
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is the moment of this call.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A hand-driven clock for deterministic tests.
///
/// Cloning yields a handle onto the same underlying time, so a test can keep
/// one handle while the machine owns another:
///
/// ```rust
/// use std::time::Duration;
/// use cadence::core::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// handle.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Duration::from_secs(5));
/// ```
///
/// The handle is `Rc`-shared and not thread-safe; the engine is
/// single-threaded by contract, so neither is its test clock.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }

    /// Jump the clock to an absolute offset.
    ///
    /// Jumping backwards breaks the monotonicity contract callers rely on.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
