//! Bounded undo history.

use super::model::SessionState;
use crate::step::ResponseAffordance;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Snapshot of session state taken before a forward transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub snapshot: SessionState,
    /// Affordance that was on screen for `from_step_id`.
    pub affordance: ResponseAffordance,
    /// The step the transition moved away from; the rollback target.
    pub from_step_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Captures `state`. Returns `None` before the first step exists, since
    /// there is nothing to roll back to.
    pub fn capture(state: &SessionState, affordance: &ResponseAffordance) -> Option<Self> {
        let from_step_id = state.current_step_id.clone()?;
        Some(Self {
            snapshot: state.clone(),
            affordance: affordance.clone(),
            from_step_id,
            recorded_at: Utc::now(),
        })
    }
}

/// Capacity-bounded LIFO store. Pushing onto a full stack evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryStack {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes `entry`, returning the evicted oldest entry if the stack was full.
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    /// Puts an entry evicted by [`Self::push`] back at the bottom, after the
    /// push that evicted it was popped again. Dropped if the stack is full.
    pub fn restore_oldest(&mut self, entry: HistoryEntry) {
        if self.entries.len() < self.capacity {
            self.entries.push_front(entry);
        }
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
