//! Reminder data model.
//!
//! A [`Reminder`] is the durable unit kept by the store. Due times are local
//! wall-clock values at minute precision, persisted as `YYYY-MM-DD HH:MM`.

mod recurrence;

pub use recurrence::{advance, advance_raw};

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RecordError;

/// Store-assigned reminder identifier. Never reused.
pub type ReminderId = i64;

/// Canonical persisted timestamp format (24-hour, no timezone).
pub const DUE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A local timestamp truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DueTime(NaiveDateTime);

impl DueTime {
    /// Truncate a wall-clock instant to its minute.
    pub fn truncate(at: NaiveDateTime) -> Self {
        let minute = at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at);
        Self(minute)
    }

    /// Parse the canonical `YYYY-MM-DD HH:MM` form.
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        NaiveDateTime::parse_from_str(raw.trim(), DUE_TIME_FORMAT)
            .map(Self)
            .map_err(|_| RecordError::MalformedTimestamp {
                id: None,
                raw: raw.to_string(),
            })
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Saturates at the calendar bounds instead of overflowing.
    pub fn plus_minutes(self, minutes: i64) -> Self {
        match Duration::try_minutes(minutes) {
            Some(delta) => self.offset(delta),
            None => self.saturate(minutes),
        }
    }

    pub fn plus_days(self, days: i64) -> Self {
        match Duration::try_days(days) {
            Some(delta) => self.offset(delta),
            None => self.saturate(days),
        }
    }

    fn saturate(self, sign: i64) -> Self {
        if sign < 0 {
            Self::truncate(NaiveDateTime::MIN)
        } else {
            Self::truncate(NaiveDateTime::MAX)
        }
    }

    fn offset(self, delta: Duration) -> Self {
        match self.0.checked_add_signed(delta) {
            Some(t) => Self(t),
            None => self.saturate(delta.num_minutes()),
        }
    }
}

impl fmt::Display for DueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DUE_TIME_FORMAT))
    }
}

impl FromStr for DueTime {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DueTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DueTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// How a reminder reschedules after it is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 5] = [
        Recurrence::None,
        Recurrence::Daily,
        Recurrence::Weekly,
        Recurrence::Monthly,
        Recurrence::Yearly,
    ];

    pub fn is_recurring(self) -> bool {
        self != Recurrence::None
    }

    /// Next tag in the order None → Daily → Weekly → Monthly → Yearly → None.
    pub fn cycle(self) -> Self {
        match self {
            Recurrence::None => Recurrence::Daily,
            Recurrence::Daily => Recurrence::Weekly,
            Recurrence::Weekly => Recurrence::Monthly,
            Recurrence::Monthly => Recurrence::Yearly,
            Recurrence::Yearly => Recurrence::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "None",
            Recurrence::Daily => "Daily",
            Recurrence::Weekly => "Weekly",
            Recurrence::Monthly => "Monthly",
            Recurrence::Yearly => "Yearly",
        }
    }

    /// Column value: recurring tags by name, `None` as SQL NULL.
    pub fn to_column(self) -> Option<&'static str> {
        self.is_recurring().then(|| self.as_str())
    }

    /// Read a nullable column. NULL, empty and "None" all mean no recurrence.
    pub fn from_column(raw: Option<&str>) -> Result<Self, RecordError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Recurrence::None),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Recurrence::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecordError::UnknownRecurrence {
                id: None,
                raw: s.to_string(),
            })
    }
}

/// A reminder as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub message: Option<String>,
    pub due_time: DueTime,
    pub recurrence: Recurrence,
    pub enabled: bool,
    /// Audit timestamps set by the store; not interpreted by the engine.
    pub created_at: Option<String>,
    pub last_modified: Option<String>,
}

/// Input for creating a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub message: Option<String>,
    pub due_time: DueTime,
    #[serde(default)]
    pub recurrence: Recurrence,
}

/// Partial update of a reminder's user-editable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the message.
    pub message: Option<Option<String>>,
    pub due_time: Option<DueTime>,
    pub recurrence: Option<Recurrence>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.message.is_none()
            && self.due_time.is_none()
            && self.recurrence.is_none()
    }
}
