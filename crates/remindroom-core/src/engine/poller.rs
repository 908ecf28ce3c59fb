//! Due-time poller.
//!
//! One [`DuePoller::scan`] call is one tick: reload every enabled reminder,
//! truncate "now" to the minute, and ask the occurrence guard which ones fire.
//! The full reload is what picks up edits made by other processes; there is
//! no invalidation channel.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Scanning -> Idle
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::guard::OccurrenceGuard;
use crate::error::{RecordError, StoreError};
use crate::reminder::{DueTime, Reminder};
use crate::storage::ReminderStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Scanning,
}

/// Result of one scanning pass.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Reminders that fire this pass, ordered by `(due_time, id)`.
    pub due: Vec<Reminder>,
    /// Records skipped this pass because they could not be parsed.
    pub malformed: Vec<RecordError>,
    /// First pass in a new minute.
    pub new_minute: bool,
    /// Guard marks dropped on a minute boundary.
    pub stale_cleared: usize,
    /// Enabled reminders examined.
    pub scanned: usize,
}

#[derive(Debug)]
pub struct DuePoller {
    state: PollerState,
    last_minute: Option<DueTime>,
}

impl Default for DuePoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DuePoller {
    pub fn new() -> Self {
        Self {
            state: PollerState::Idle,
            last_minute: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Minute of the most recent completed pass.
    pub fn last_minute(&self) -> Option<DueTime> {
        self.last_minute
    }

    /// Run one scanning pass.
    ///
    /// A store read failure aborts this pass only; the poller is back in
    /// `Idle` and the next call retries.
    pub fn scan<S>(
        &mut self,
        store: &S,
        guard: &mut OccurrenceGuard,
        now: NaiveDateTime,
    ) -> Result<ScanOutcome, StoreError>
    where
        S: ReminderStore + ?Sized,
    {
        self.state = PollerState::Scanning;
        let result = self.scan_inner(store, guard, now);
        self.state = PollerState::Idle;
        result
    }

    fn scan_inner<S>(
        &mut self,
        store: &S,
        guard: &mut OccurrenceGuard,
        now: NaiveDateTime,
    ) -> Result<ScanOutcome, StoreError>
    where
        S: ReminderStore + ?Sized,
    {
        let records = store.list_enabled()?;
        let now_minute = DueTime::truncate(now);

        let mut outcome = ScanOutcome {
            new_minute: self.last_minute != Some(now_minute),
            ..ScanOutcome::default()
        };
        let mut reminders = Vec::with_capacity(records.len());
        for record in records {
            match record {
                Ok(reminder) if reminder.enabled => reminders.push(reminder),
                Ok(_) => {}
                Err(e) => {
                    if outcome.new_minute {
                        tracing::warn!(error = %e, "skipping malformed reminder this minute");
                    }
                    outcome.malformed.push(e);
                }
            }
        }
        reminders.sort_by(|a, b| a.due_time.cmp(&b.due_time).then(a.id.cmp(&b.id)));
        outcome.scanned = reminders.len();

        if outcome.new_minute {
            outcome.stale_cleared = guard.clear_all_stale(
                now_minute,
                reminders.iter().map(|r| (r.id, r.due_time)),
            );
            if outcome.stale_cleared > 0 {
                tracing::debug!(count = outcome.stale_cleared, "cleared stale occurrence marks");
            }
            self.last_minute = Some(now_minute);
        }

        outcome.due = reminders
            .into_iter()
            .filter(|r| guard.should_fire(r.id, r.due_time, now_minute))
            .collect();

        tracing::debug!(
            minute = %now_minute,
            scanned = outcome.scanned,
            due = outcome.due.len(),
            "scan complete"
        );
        Ok(outcome)
    }
}
