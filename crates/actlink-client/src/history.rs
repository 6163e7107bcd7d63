//! Bounded encounter history.
//!
//! `last` is the most recently accepted snapshot, active or not. `past` holds
//! completed encounters, oldest first, and never grows beyond its capacity.
//! Events are stored behind [`Arc`] because an accepted snapshot is immutable
//! once stamped, so `last` and the newest `past` entry may share one.

use std::collections::VecDeque;
use std::sync::Arc;

use actlink_core::CombatEvent;

/// Most recent snapshot plus a FIFO of completed encounters.
#[derive(Clone, Debug, Default)]
pub struct EncounterHistory {
    last: Option<Arc<CombatEvent>>,
    past: VecDeque<Arc<CombatEvent>>,
    capacity: usize,
}

impl EncounterHistory {
    /// Empty history keeping at most `capacity` completed encounters.
    pub fn new(capacity: usize) -> Self {
        Self {
            last: None,
            past: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of completed encounters retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently accepted snapshot.
    pub fn last(&self) -> Option<&Arc<CombatEvent>> {
        self.last.as_ref()
    }

    /// Completed encounters, oldest first.
    pub fn past(&self) -> impl ExactSizeIterator<Item = &Arc<CombatEvent>> {
        self.past.iter()
    }

    /// Number of completed encounters held.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Past encounter at `index` (oldest is 0), falling back to `last` when
    /// `index` is `None` or out of range.
    pub fn event(&self, index: Option<usize>) -> Option<&Arc<CombatEvent>> {
        index
            .and_then(|i| self.past.get(i))
            .or(self.last.as_ref())
    }

    pub(crate) fn set_last(&mut self, event: Arc<CombatEvent>) {
        self.last = Some(event);
    }

    /// Append a completed encounter, evicting the oldest beyond capacity.
    pub(crate) fn push_past(&mut self, event: Arc<CombatEvent>) {
        self.past.push_back(event);
        while self.past.len() > self.capacity {
            let _ = self.past.pop_front();
        }
    }

    /// Forget the current snapshot. Past encounters are kept.
    pub fn clear_last(&mut self) {
        self.last = None;
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.last = None;
        self.past.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
