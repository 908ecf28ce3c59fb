//! Occurrence guard.
//!
//! Remembers, per reminder, the due time it last fired for. A reminder can
//! fire at most once for a given `(id, due_time)` until it is re-armed. The
//! state is process-local and starts empty on every launch.

use std::collections::HashMap;

use crate::reminder::{DueTime, ReminderId};

#[derive(Debug, Default, Clone)]
pub struct OccurrenceGuard {
    fired: HashMap<ReminderId, DueTime>,
}

impl OccurrenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-and-set: `true` exactly once per `(id, due)` while `due <= now_minute`.
    ///
    /// A reminder seen with a future due time loses any mark it had, which
    /// re-arms it if the user moved it forward while it was fired.
    pub fn should_fire(&mut self, id: ReminderId, due: DueTime, now_minute: DueTime) -> bool {
        if due > now_minute {
            self.fired.remove(&id);
            return false;
        }
        match self.fired.get(&id) {
            Some(marked) if *marked == due => false,
            _ => {
                self.fired.insert(id, due);
                true
            }
        }
    }

    /// Clear the mark so the reminder may fire again for its current due time.
    pub fn rearm(&mut self, id: ReminderId) {
        self.fired.remove(&id);
    }

    /// Drop marks that no longer match the store: the reminder vanished from
    /// the enabled set, or its due time differs from the one that fired.
    /// Returns the number of marks dropped.
    pub fn clear_all_stale<I>(&mut self, now_minute: DueTime, current: I) -> usize
    where
        I: IntoIterator<Item = (ReminderId, DueTime)>,
    {
        let current: HashMap<ReminderId, DueTime> = current.into_iter().collect();
        let before = self.fired.len();
        self.fired.retain(|id, marked| match current.get(id) {
            Some(due) => due == marked && *due <= now_minute,
            None => false,
        });
        before - self.fired.len()
    }

    pub fn is_marked(&self, id: ReminderId) -> bool {
        self.fired.contains_key(&id)
    }

    /// Due time the reminder last fired for, if marked.
    pub fn marked_due(&self, id: ReminderId) -> Option<DueTime> {
        self.fired.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
