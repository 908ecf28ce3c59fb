//! Notification lifecycle.
//!
//! Every fired reminder gets an [`ActiveNotification`] that stays registered
//! until the user resolves it with a dismiss or a snooze. Resolving writes the
//! outcome back to the store, re-arms the occurrence guard and stops the alert
//! sound.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Fired -> Dismissed
//!              \-> Snoozed
//!              \-> Vanished     (reminder deleted while fired)
//!              \-> Superseded   (due time edited while fired)
//! ```
//!
//! A resolution only ever applies to the occurrence that fired. When the
//! stored due time no longer matches the snapshot, the record already
//! describes a newer occurrence and is left untouched.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::guard::OccurrenceGuard;
use crate::error::{CoreError, StoreError, ValidationError};
use crate::events::Event;
use crate::reminder::{advance, DueTime, Reminder, ReminderId};
use crate::sound::{SoundController, SoundSource};
use crate::storage::{OneShotPolicy, ReminderStore};

/// Longest accepted snooze: one year.
pub const MAX_SNOOZE_MINUTES: i64 = 366 * 24 * 60;

/// A fired reminder waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNotification {
    /// Snapshot taken when the reminder fired.
    pub reminder: Reminder,
    pub fired_at: NaiveDateTime,
    /// Whether the alert loop currently belongs to this notification.
    pub sound_looping: bool,
}

impl ActiveNotification {
    pub fn id(&self) -> ReminderId {
        self.reminder.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "minutes", rename_all = "lowercase")]
pub enum Resolution {
    Dismiss,
    /// Push the due time to `now + minutes`.
    Snooze(i64),
}

/// What a resolution did to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolved {
    Dismissed {
        id: ReminderId,
        /// Set when a recurring reminder rolled over.
        next_due: Option<DueTime>,
        disabled: bool,
    },
    Snoozed {
        id: ReminderId,
        minutes: i64,
        due_time: DueTime,
    },
    Vanished {
        id: ReminderId,
    },
    /// The due time was edited after the reminder fired. Nothing was written.
    Superseded {
        id: ReminderId,
        due_time: DueTime,
    },
}

impl Resolved {
    pub fn id(&self) -> ReminderId {
        match self {
            Resolved::Dismissed { id, .. }
            | Resolved::Snoozed { id, .. }
            | Resolved::Vanished { id }
            | Resolved::Superseded { id, .. } => *id,
        }
    }

    pub fn to_event(&self) -> Event {
        let at = chrono::Utc::now();
        match self.clone() {
            Resolved::Dismissed {
                id,
                next_due,
                disabled,
            } => Event::ReminderDismissed {
                id,
                next_due,
                disabled,
                at,
            },
            Resolved::Snoozed {
                id,
                minutes,
                due_time,
            } => Event::ReminderSnoozed {
                id,
                minutes,
                due_time,
                at,
            },
            Resolved::Vanished { id } => Event::ReminderVanished { id, at },
            Resolved::Superseded { id, due_time } => {
                Event::ReminderSuperseded { id, due_time, at }
            }
        }
    }
}

/// Owns the set of active notifications.
#[derive(Debug, Default)]
pub struct NotificationController {
    active: BTreeMap<ReminderId, ActiveNotification>,
    policy: OneShotPolicy,
}

impl NotificationController {
    pub fn new(policy: OneShotPolicy) -> Self {
        Self {
            active: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> OneShotPolicy {
        self.policy
    }

    /// Register a fired reminder and start the alert loop.
    ///
    /// `source` is `None` when sound is disabled. A notification already
    /// active for the same id is replaced.
    pub fn on_reminder_due(
        &mut self,
        reminder: Reminder,
        fired_at: NaiveDateTime,
        sound: &mut SoundController,
        source: Option<SoundSource>,
    ) -> ActiveNotification {
        // The new loop replaces whatever played for an earlier notification.
        self.detach_sound();
        let sound_looping = match source {
            Some(source) => {
                sound.start_loop(source);
                true
            }
            None => false,
        };

        tracing::info!(id = reminder.id, title = %reminder.title, due = %reminder.due_time, "reminder fired");
        let notification = ActiveNotification {
            reminder,
            fired_at,
            sound_looping,
        };
        if self
            .active
            .insert(notification.id(), notification.clone())
            .is_some()
        {
            tracing::debug!(id = notification.id(), "replaced active notification");
        }
        notification
    }

    /// Resolve the notification for `id`.
    ///
    /// # Errors
    /// - `CoreError::NotActive` if nothing is active for `id`.
    /// - `ValidationError::InvalidSnooze` for a snooze outside
    ///   `1..=MAX_SNOOZE_MINUTES`; the notification stays active and the
    ///   sound keeps playing.
    /// - `StoreError` if the store cannot be read or written; the sound is
    ///   already stopped and the notification stays active.
    pub fn resolve<S>(
        &mut self,
        id: ReminderId,
        resolution: Resolution,
        now: NaiveDateTime,
        store: &S,
        guard: &mut OccurrenceGuard,
        sound: &mut SoundController,
    ) -> Result<Resolved, CoreError>
    where
        S: ReminderStore + ?Sized,
    {
        let Some(fired_due) = self.active.get(&id).map(|n| n.reminder.due_time) else {
            return Err(CoreError::NotActive(id));
        };
        if let Resolution::Snooze(minutes) = resolution {
            if !(1..=MAX_SNOOZE_MINUTES).contains(&minutes) {
                return Err(ValidationError::InvalidSnooze(minutes).into());
            }
        }

        self.stop_sound(sound);

        let current = match store.get(id) {
            Ok(reminder) => reminder,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(id, "reminder deleted while fired");
                guard.rearm(id);
                self.active.remove(&id);
                return Ok(Resolved::Vanished { id });
            }
            Err(e) => return Err(e.into()),
        };

        if current.due_time != fired_due {
            tracing::info!(id, fired = %fired_due, stored = %current.due_time, "reminder rescheduled while fired");
            self.active.remove(&id);
            return Ok(Resolved::Superseded {
                id,
                due_time: current.due_time,
            });
        }

        let resolved = match resolution {
            Resolution::Dismiss => self.dismiss(&current, store, guard)?,
            Resolution::Snooze(minutes) => {
                let due_time = DueTime::truncate(now).plus_minutes(minutes);
                store.update_due_and_enabled(id, due_time, current.recurrence, true)?;
                guard.rearm(id);
                Resolved::Snoozed {
                    id,
                    minutes,
                    due_time,
                }
            }
        };

        self.active.remove(&id);
        tracing::info!(id, outcome = ?resolved, "notification resolved");
        Ok(resolved)
    }

    fn dismiss<S>(
        &self,
        current: &Reminder,
        store: &S,
        guard: &mut OccurrenceGuard,
    ) -> Result<Resolved, StoreError>
    where
        S: ReminderStore + ?Sized,
    {
        let id = current.id;
        if current.recurrence.is_recurring() {
            let next = advance(current.due_time, current.recurrence);
            store.update_due_and_enabled(id, next, current.recurrence, true)?;
            guard.rearm(id);
            return Ok(Resolved::Dismissed {
                id,
                next_due: Some(next),
                disabled: false,
            });
        }

        match self.policy {
            OneShotPolicy::Disable => {
                store.update_due_and_enabled(id, current.due_time, current.recurrence, false)?;
                guard.rearm(id);
                Ok(Resolved::Dismissed {
                    id,
                    next_due: None,
                    disabled: true,
                })
            }
            // The guard mark is what keeps the unchanged record quiet.
            OneShotPolicy::Keep => Ok(Resolved::Dismissed {
                id,
                next_due: None,
                disabled: false,
            }),
        }
    }

    /// Force-dismiss every active notification in id order, then stop sound.
    ///
    /// Failures are logged; shutdown always completes.
    pub fn shutdown<S>(
        &mut self,
        now: NaiveDateTime,
        store: &S,
        guard: &mut OccurrenceGuard,
        sound: &mut SoundController,
    ) -> Vec<Resolved>
    where
        S: ReminderStore + ?Sized,
    {
        let ids: Vec<ReminderId> = self.active.keys().copied().collect();
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.resolve(id, Resolution::Dismiss, now, store, guard, sound) {
                Ok(r) => resolved.push(r),
                Err(e) => {
                    tracing::error!(id, error = %e, "failed to dismiss on shutdown");
                    self.active.remove(&id);
                }
            }
        }
        sound.stop();
        resolved
    }

    fn stop_sound(&mut self, sound: &mut SoundController) {
        sound.stop();
        self.detach_sound();
    }

    /// Clear every `sound_looping` flag after the loop was stopped or
    /// replaced outside the controller.
    pub fn detach_sound(&mut self) {
        for n in self.active.values_mut() {
            n.sound_looping = false;
        }
    }

    pub fn get(&self, id: ReminderId) -> Option<&ActiveNotification> {
        self.active.get(&id)
    }

    /// Active notifications in id order.
    pub fn active(&self) -> impl Iterator<Item = &ActiveNotification> {
        self.active.values()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
