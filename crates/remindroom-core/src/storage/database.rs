//! SQLite-based reminder storage.
//!
//! Provides persistent storage for:
//! - Reminder records (title, message, due time, recurrence, enabled flag)
//! - Audit timestamps maintained on every write
//! - Key-value settings (custom sound path and similar)

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations, ReminderStore};
use crate::error::{RecordError, StoreError, ValidationError};
use crate::reminder::{DueTime, NewReminder, Recurrence, Reminder, ReminderId, ReminderPatch};

const REMINDER_COLUMNS: &str =
    "id, title, message, due_time, recurrence, enabled, created_at, last_modified";

/// Counts shown in the reminder overview.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ReminderStats {
    pub total: u64,
    pub enabled: u64,
    pub disabled: u64,
    pub recurring: u64,
    /// Enabled reminders whose due time is before the given minute.
    pub overdue: u64,
    /// Records that could not be parsed.
    pub malformed: u64,
}

/// SQLite database for reminders and settings.
pub struct ReminderDb {
    conn: Connection,
}

impl ReminderDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/reminders.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::open_at(dir.join("reminders.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        // The CLI and a running watcher share the file.
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert a reminder and return the stored record.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyTitle` (wrapped) for blank titles, or a
    /// store error if the insert fails.
    pub fn create(&self, new: &NewReminder) -> Result<Reminder, crate::error::CoreError> {
        let title = validate_title(&new.title)?;
        self.conn
            .execute(
                "INSERT INTO reminders (title, message, due_time, recurrence, enabled, created_at, last_modified)
                 VALUES (?1, ?2, ?3, ?4, 1, datetime('now'), datetime('now'))",
                params![
                    title,
                    normalize_message(new.message.as_deref()),
                    new.due_time.to_string(),
                    new.recurrence.to_column(),
                ],
            )
            .map_err(StoreError::from)?;
        let id = self.conn.last_insert_rowid();
        Ok(self.get(id)?)
    }

    /// Apply a partial edit. Enabled state is left as-is.
    pub fn update(
        &self,
        id: ReminderId,
        patch: &ReminderPatch,
    ) -> Result<Reminder, crate::error::CoreError> {
        let current = self.get(id)?;
        let title = match &patch.title {
            Some(t) => validate_title(t)?,
            None => current.title.clone(),
        };
        let message = match &patch.message {
            Some(m) => normalize_message(m.as_deref()),
            None => current.message.clone(),
        };
        let due_time = patch.due_time.unwrap_or(current.due_time);
        let recurrence = patch.recurrence.unwrap_or(current.recurrence);

        self.conn
            .execute(
                "UPDATE reminders
                    SET title = ?1, message = ?2, due_time = ?3, recurrence = ?4,
                        last_modified = datetime('now')
                  WHERE id = ?5",
                params![
                    title,
                    message,
                    due_time.to_string(),
                    recurrence.to_column(),
                    id
                ],
            )
            .map_err(StoreError::from)?;
        Ok(self.get(id)?)
    }

    /// Delete a reminder. Deleting a missing id is `NotFound`.
    pub fn delete(&self, id: ReminderId) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub fn set_enabled(&self, id: ReminderId, enabled: bool) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE reminders SET enabled = ?1, last_modified = datetime('now') WHERE id = ?2",
            params![enabled, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Enable or disable every reminder whose flag differs. Returns the number changed.
    pub fn set_all_enabled(&self, enabled: bool) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            "UPDATE reminders SET enabled = ?1, last_modified = datetime('now')
              WHERE COALESCE(enabled, 1) != ?1",
            params![enabled],
        )?;
        Ok(changed)
    }

    /// Every reminder, ordered by due time then id.
    pub fn list_all(&self) -> Result<Vec<Result<Reminder, RecordError>>, StoreError> {
        self.query_reminders(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY due_time, id"
        ))
    }

    pub fn stats(&self, now: DueTime) -> Result<ReminderStats, StoreError> {
        let mut stats = ReminderStats::default();
        for record in self.list_all()? {
            stats.total += 1;
            match record {
                Ok(reminder) => {
                    if reminder.enabled {
                        stats.enabled += 1;
                        if reminder.due_time < now {
                            stats.overdue += 1;
                        }
                    } else {
                        stats.disabled += 1;
                    }
                    if reminder.recurrence.is_recurring() {
                        stats.recurring += 1;
                    }
                }
                Err(_) => stats.malformed += 1,
            }
        }
        Ok(stats)
    }

    fn query_reminders(
        &self,
        sql: &str,
    ) -> Result<Vec<Result<Reminder, RecordError>>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], RawReminder::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_reminder());
        }
        Ok(out)
    }
}

impl ReminderStore for ReminderDb {
    fn list_enabled(&self) -> Result<Vec<Result<Reminder, RecordError>>, StoreError> {
        self.query_reminders(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders
              WHERE COALESCE(enabled, 1) != 0
              ORDER BY due_time, id"
        ))
    }

    fn get(&self, id: ReminderId) -> Result<Reminder, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1"),
                params![id],
                RawReminder::from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        raw.into_reminder()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn update_due_and_enabled(
        &self,
        id: ReminderId,
        due_time: DueTime,
        recurrence: Recurrence,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE reminders
                SET due_time = ?1, recurrence = ?2, enabled = ?3, last_modified = datetime('now')
              WHERE id = ?4",
            params![due_time.to_string(), recurrence.to_column(), enabled, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn clear_setting(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Row as stored, before the due time and recurrence are interpreted.
struct RawReminder {
    id: ReminderId,
    title: String,
    message: Option<String>,
    due_time: String,
    recurrence: Option<String>,
    enabled: Option<bool>,
    created_at: Option<String>,
    last_modified: Option<String>,
}

impl RawReminder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            message: row.get(2)?,
            due_time: row.get(3)?,
            recurrence: row.get(4)?,
            enabled: row.get(5)?,
            created_at: row.get(6)?,
            last_modified: row.get(7)?,
        })
    }

    fn into_reminder(self) -> Result<Reminder, RecordError> {
        let due_time = DueTime::parse(&self.due_time).map_err(|e| e.with_id(self.id))?;
        let recurrence =
            Recurrence::from_column(self.recurrence.as_deref()).map_err(|e| e.with_id(self.id))?;
        Ok(Reminder {
            id: self.id,
            title: self.title,
            message: self.message,
            due_time,
            recurrence,
            enabled: self.enabled.unwrap_or(true),
            created_at: self.created_at,
            last_modified: self.last_modified,
        })
    }
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_message(message: Option<&str>) -> Option<String> {
    message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
