//! Reminder management commands for CLI.

use clap::Subcommand;
use remindroom_core::{
    DueTime, NewReminder, Recurrence, ReminderDb, ReminderPatch, ReminderStore, ValidationError,
};
use serde_json::json;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Create a new reminder
    Add {
        /// Reminder title
        title: String,
        /// Longer text shown with the notification
        #[arg(long)]
        message: Option<String>,
        /// Due time as "YYYY-MM-DD HH:MM" (default: the current minute)
        #[arg(long)]
        due: Option<DueTime>,
        /// none, daily, weekly, monthly or yearly
        #[arg(long, default_value = "none")]
        recurrence: Recurrence,
    },
    /// List all reminders
    List {
        /// Only enabled reminders
        #[arg(long)]
        enabled: bool,
    },
    /// Get reminder details
    Get {
        /// Reminder ID
        id: i64,
    },
    /// Update a reminder
    Update {
        /// Reminder ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New message
        #[arg(long, conflicts_with = "clear_message")]
        message: Option<String>,
        /// Remove the message
        #[arg(long)]
        clear_message: bool,
        /// New due time as "YYYY-MM-DD HH:MM"
        #[arg(long)]
        due: Option<DueTime>,
        /// New recurrence
        #[arg(long)]
        recurrence: Option<Recurrence>,
    },
    /// Delete a reminder
    Delete {
        /// Reminder ID
        id: i64,
    },
    /// Enable a reminder
    Enable {
        /// Reminder ID
        id: i64,
    },
    /// Disable a reminder
    Disable {
        /// Reminder ID
        id: i64,
    },
    /// Enable every reminder
    EnableAll,
    /// Disable every reminder
    DisableAll,
    /// Step the recurrence: none → daily → weekly → monthly → yearly → none
    Recur {
        /// Reminder ID
        id: i64,
    },
}

pub fn run(action: ReminderAction) -> CmdResult {
    let db = ReminderDb::open()?;

    match action {
        ReminderAction::Add {
            title,
            message,
            due,
            recurrence,
        } => {
            let reminder = db.create(&NewReminder {
                title,
                message,
                due_time: due.unwrap_or_else(|| DueTime::truncate(super::now())),
                recurrence,
            })?;
            print_json(&reminder)?;
        }
        ReminderAction::List { enabled } => {
            let records = if enabled {
                db.list_enabled()?
            } else {
                db.list_all()?
            };
            let mut reminders = Vec::with_capacity(records.len());
            for record in records {
                match record {
                    Ok(r) => reminders.push(r),
                    Err(e) => eprintln!("warning: {e}"),
                }
            }
            print_json(&reminders)?;
        }
        ReminderAction::Get { id } => {
            print_json(&db.get(id)?)?;
        }
        ReminderAction::Update {
            id,
            title,
            message,
            clear_message,
            due,
            recurrence,
        } => {
            let patch = ReminderPatch {
                title,
                message: if clear_message { Some(None) } else { message.map(Some) },
                due_time: due,
                recurrence,
            };
            if patch.is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "update".into(),
                    message: "nothing to update".into(),
                }
                .into());
            }
            print_json(&db.update(id, &patch)?)?;
        }
        ReminderAction::Delete { id } => {
            db.delete(id)?;
            print_json(&json!({ "deleted": id }))?;
        }
        ReminderAction::Enable { id } => {
            db.set_enabled(id, true)?;
            print_json(&db.get(id)?)?;
        }
        ReminderAction::Disable { id } => {
            db.set_enabled(id, false)?;
            print_json(&db.get(id)?)?;
        }
        ReminderAction::EnableAll => {
            let changed = db.set_all_enabled(true)?;
            print_json(&json!({ "changed": changed }))?;
        }
        ReminderAction::DisableAll => {
            let changed = db.set_all_enabled(false)?;
            print_json(&json!({ "changed": changed }))?;
        }
        ReminderAction::Recur { id } => {
            let current = db.get(id)?;
            let patch = ReminderPatch {
                recurrence: Some(current.recurrence.cycle()),
                ..ReminderPatch::default()
            };
            print_json(&db.update(id, &patch)?)?;
        }
    }
    Ok(())
}
