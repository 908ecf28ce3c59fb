//! # Remindroom Core Library
//!
//! This library provides the reminder scheduling and notification engine behind
//! Remindroom. Every operation is available through the standalone CLI binary;
//! any richer shell is a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Engine**: A caller-driven poller that must be ticked (once a second by
//!   default). It fires each due reminder once per due time and tracks the
//!   resulting notification until the user dismisses or snoozes it.
//! - **Recurrence**: Fixed-offset rollover (daily, weekly, 30 days, 365 days)
//! - **Sound**: Looping alert on a worker thread with a file → platform → bell
//!   fallback chain
//! - **Storage**: SQLite-based reminder storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: Poller, guard, notifications and sound wired together
//! - [`ReminderDb`]: Reminder and settings persistence
//! - [`Config`]: Application configuration management
//! - [`ReminderStore`]: The store interface the engine depends on

pub mod engine;
pub mod error;
pub mod events;
pub mod reminder;
pub mod sound;
pub mod storage;

pub use engine::{
    ActiveNotification, EngineOptions, OccurrenceGuard, ReminderEngine, Resolution, Resolved,
    TickReport,
};
pub use error::{ConfigError, CoreError, RecordError, SoundError, StoreError, ValidationError};
pub use events::Event;
pub use reminder::{DueTime, NewReminder, Recurrence, Reminder, ReminderId, ReminderPatch};
pub use sound::{PlaybackMode, RecordingBackend, SoundController, SoundSource, SystemBackend};
pub use storage::{Config, ReminderDb, ReminderStore};
