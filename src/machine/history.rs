//! Bounded log of fired transitions.
//!
//! Every edge the scheduler actually fires (including forced
//! [`transit_to`](super::FiniteStateMachine::transit_to) calls) is appended
//! here with a wall-clock stamp and the tick number. The log is telemetry
//! for observers and tests; it is never replayed.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::StateId;

/// Record of a single fired transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being left.
    pub from: StateId,
    /// The state being entered.
    pub to: StateId,
    /// Wall-clock time of the firing.
    pub at: DateTime<Utc>,
    /// The scheduler tick during which the edge fired (0 for forced
    /// transitions before the first tick).
    pub tick: u64,
}

/// Ring of the most recent [`TransitionRecord`]s.
///
/// Bounded so long-running machines (a traffic light ticks forever) cannot
/// grow memory without bound. The default capacity keeps the recent past;
/// callers wanting more pass their own via
/// [`with_capacity`](TransitionLog::with_capacity).
#[derive(Clone, Debug)]
pub struct TransitionLog {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl TransitionLog {
    /// Default number of records retained.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a log retaining at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn record(&mut self, record: TransitionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has fired yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The sequence of states traversed: the origin of the oldest retained
    /// record, then each record's destination.
    pub fn path(&self) -> Vec<StateId> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.front() {
            path.push(first.from);
        }
        path.extend(self.records.iter().map(|r| r.to));
        path
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: usize, to: usize, tick: u64) -> TransitionRecord {
        TransitionRecord {
            from: StateId(from),
            to: StateId(to),
            at: Utc::now(),
            tick,
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log = TransitionLog::new();
        assert!(log.is_empty());
        assert!(log.path().is_empty());
        assert!(log.last().is_none());
    }

    #[test]
    fn path_includes_the_origin() {
        let mut log = TransitionLog::new();
        log.record(record(0, 1, 1));
        log.record(record(1, 2, 2));
        assert_eq!(log.path(), vec![StateId(0), StateId(1), StateId(2)]);
    }

    #[test]
    fn capacity_drops_the_oldest_record() {
        let mut log = TransitionLog::with_capacity(2);
        log.record(record(0, 1, 1));
        log.record(record(1, 2, 2));
        log.record(record(2, 3, 3));
        assert_eq!(log.len(), 2);
        assert_eq!(log.path(), vec![StateId(1), StateId(2), StateId(3)]);
        assert_eq!(log.last().unwrap().to, StateId(3));
    }

    #[test]
    fn records_serialize_correctly() {
        let rec = record(0, 1, 7);
        let json = serde_json::to_string(&rec).unwrap();
        let back: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
