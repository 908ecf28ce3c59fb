use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::{DueTime, Recurrence, ReminderId};
use crate::sound::{PlaybackMode, SoundSource};

/// Every state change in the engine produces an Event.
/// The shell prints them; tests assert on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderFired {
        id: ReminderId,
        title: String,
        message: Option<String>,
        due_time: DueTime,
        recurrence: Recurrence,
        at: DateTime<Utc>,
    },
    /// Dismissed; `next_due` is set when a recurring reminder rolled over.
    ReminderDismissed {
        id: ReminderId,
        next_due: Option<DueTime>,
        disabled: bool,
        at: DateTime<Utc>,
    },
    ReminderSnoozed {
        id: ReminderId,
        minutes: i64,
        due_time: DueTime,
        at: DateTime<Utc>,
    },
    /// The reminder was deleted while its notification was open.
    ReminderVanished {
        id: ReminderId,
        at: DateTime<Utc>,
    },
    /// The due time changed while the notification was open; the store was
    /// left as edited.
    ReminderSuperseded {
        id: ReminderId,
        due_time: DueTime,
        at: DateTime<Utc>,
    },
    /// A record was skipped for one pass because it could not be parsed.
    RecordSkipped {
        reason: String,
        at: DateTime<Utc>,
    },
    /// The store could not be read; the next tick retries.
    ScanFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    SoundStarted {
        mode: PlaybackMode,
        source: SoundSource,
        at: DateTime<Utc>,
    },
    SoundStopped {
        at: DateTime<Utc>,
    },
    EngineShutdown {
        dismissed: usize,
        at: DateTime<Utc>,
    },
}
