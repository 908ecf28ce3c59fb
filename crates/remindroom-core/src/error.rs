//! Core error types for remindroom-core.
//!
//! This module defines the error hierarchy for the engine using thiserror.
//! None of these errors is fatal to a running engine: the poller logs and
//! retries on the next tick, and sound errors are absorbed by the fallback
//! chain.

use std::path::PathBuf;
use thiserror::Error;

use crate::reminder::ReminderId;

/// Core error type for remindroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored record could not be interpreted
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Sound playback errors
    #[error("Sound error: {0}")]
    Sound(#[from] SoundError),

    /// Resolution requested for a reminder that has no active notification
    #[error("No active notification for reminder {0}")]
    NotActive(ReminderId),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reminder store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Transient read/write failure; the poller retries on the next tick
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// No reminder with this id
    #[error("Reminder {0} not found")]
    NotFound(ReminderId),

    /// Migration failed
    #[error("Store migration failed: {0}")]
    Migration(String),
}

/// Errors for individual records that fail to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// due_time is not in `YYYY-MM-DD HH:MM` form
    #[error("Malformed due_time '{raw}' on reminder {id:?}")]
    MalformedTimestamp { id: Option<ReminderId>, raw: String },

    /// recurrence is not one of None/Daily/Weekly/Monthly/Yearly
    #[error("Unknown recurrence '{raw}' on reminder {id:?}")]
    UnknownRecurrence { id: Option<ReminderId>, raw: String },
}

impl RecordError {
    /// Attach the owning reminder id to an error produced while parsing a bare value.
    pub fn with_id(self, id: ReminderId) -> Self {
        match self {
            RecordError::MalformedTimestamp { raw, .. } => {
                RecordError::MalformedTimestamp { id: Some(id), raw }
            }
            RecordError::UnknownRecurrence { raw, .. } => {
                RecordError::UnknownRecurrence { id: Some(id), raw }
            }
        }
    }
}

/// Sound playback errors.
#[derive(Error, Debug)]
pub enum SoundError {
    /// The requested source cannot be played; callers fall through to the next source
    #[error("Sound source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Reminder titles must contain something other than whitespace
    #[error("Reminder title must not be empty")]
    EmptyTitle,

    /// Snooze delays are whole minutes, from one minute up to a year
    #[error("Snooze must be between 1 minute and one year (got {0} minutes)")]
    InvalidSnooze(i64),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::Unavailable("query returned no rows".to_string())
            }
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Unavailable("database is locked".to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
