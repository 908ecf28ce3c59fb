//! Settings stored in `config.toml` under the data directory.
//!
//! Keys are dot paths into the TOML tables, so `poller.tick_ms` addresses
//! `tick_ms` in `[poller]`. The engine reads the file once at `watch`
//! startup; changes apply to the next run.

use clap::Subcommand;
use remindroom_core::{Config, ConfigError};
use serde_json::json;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dot path, e.g. "poller.tick_ms" or "reminders.after_dismiss"
        key: String,
    },
    /// Change one setting and save
    Set {
        key: String,
        /// Parsed as the setting's own type
        value: String,
    },
    /// Print every setting as JSON
    List,
    /// Overwrite the file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            // Echo the value as stored, after type conversion.
            print_json(&json!({ "key": key, "value": config.get(&key) }))?;
        }
        ConfigAction::List => print_json(&Config::load()?)?,
        ConfigAction::Reset => {
            let defaults = Config::default();
            defaults.save()?;
            tracing::info!("configuration reset to defaults");
            print_json(&defaults)?;
        }
    }
    Ok(())
}
