mod config;
pub mod database;
pub mod migrations;

pub use config::{
    Config, NotificationsConfig, OneShotPolicy, PollerConfig, RemindersConfig, SoundConfig,
};
pub use database::{ReminderDb, ReminderStats};

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, RecordError, StoreError};
use crate::reminder::{DueTime, Recurrence, Reminder, ReminderId};

/// Settings key holding the custom alert sound path.
pub const SOUND_FILE_KEY: &str = "sound_file";

/// Returns the data directory, creating it if needed.
///
/// `REMINDROOM_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/remindroom[-dev]/`, with `-dev` selected by `REMINDROOM_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("REMINDROOM_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("REMINDROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("remindroom-dev")
            } else {
                base_dir.join("remindroom")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Custom alert sound path from the settings table.
///
/// A relative value is resolved against `data_dir`. Blank values count as unset.
pub fn sound_file_path<S>(store: &S, data_dir: &Path) -> Result<Option<PathBuf>, StoreError>
where
    S: ReminderStore + ?Sized,
{
    let Some(raw) = store.get_setting(SOUND_FILE_KEY)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        Ok(Some(path.to_path_buf()))
    } else {
        Ok(Some(data_dir.join(path)))
    }
}

/// The slice of the reminder store the engine depends on.
///
/// Implementations must make each single-record read and write atomic; the
/// engine never needs cross-record transactions.
pub trait ReminderStore {
    /// Every enabled reminder. Records that fail to parse come back as
    /// per-record errors so one bad row cannot hide the rest.
    fn list_enabled(&self) -> Result<Vec<Result<Reminder, RecordError>>, StoreError>;

    /// One reminder by id, or `StoreError::NotFound`.
    fn get(&self, id: ReminderId) -> Result<Reminder, StoreError>;

    fn update_due_and_enabled(
        &self,
        id: ReminderId,
        due_time: DueTime,
        recurrence: Recurrence,
        enabled: bool,
    ) -> Result<(), StoreError>;

    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn clear_setting(&self, key: &str) -> Result<(), StoreError>;

    /// Setting value, or `default` when unset.
    fn setting_or(&self, key: &str, default: &str) -> Result<String, StoreError> {
        Ok(self.get_setting(key)?.unwrap_or_else(|| default.to_string()))
    }
}
