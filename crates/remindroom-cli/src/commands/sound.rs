//! Alert sound commands for CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Subcommand;
use remindroom_core::storage::{data_dir, sound_file_path, SOUND_FILE_KEY};
use remindroom_core::{
    Config, RecordingBackend, ReminderDb, ReminderStore, SoundController, SystemBackend,
    ValidationError,
};
use serde_json::json;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum SoundAction {
    /// Show the configured alert sound
    Show,
    /// Use a custom sound file
    Set {
        /// Path to the sound file
        path: PathBuf,
    },
    /// Go back to the platform sound
    Clear,
    /// Play the alert once
    Test {
        /// How long to let it play
        #[arg(long, default_value = "3")]
        seconds: u64,
        /// Resolve the source without making noise
        #[arg(long)]
        mute: bool,
    },
}

pub fn run(action: SoundAction) -> CmdResult {
    let db = ReminderDb::open()?;
    let dir = data_dir()?;

    match action {
        SoundAction::Show => {
            let stored = db.get_setting(SOUND_FILE_KEY)?;
            let path = sound_file_path(&db, &dir)?;
            let source = SoundController::resolve_source(path.as_deref());
            print_json(&json!({
                "sound_file": stored,
                "path": path,
                "source": source,
            }))?;
        }
        SoundAction::Set { path } => {
            if !path.is_file() {
                return Err(ValidationError::InvalidValue {
                    field: "path".into(),
                    message: format!("{} is not a file", path.display()),
                }
                .into());
            }
            let stored = stored_form(&path, &dir)?;
            db.set_setting(SOUND_FILE_KEY, &stored)?;
            print_json(&json!({ "sound_file": stored }))?;
        }
        SoundAction::Clear => {
            db.clear_setting(SOUND_FILE_KEY)?;
            print_json(&json!({ "sound_file": null }))?;
        }
        SoundAction::Test { seconds, mute } => {
            let config = Config::load_or_default();
            let path = sound_file_path(&db, &dir)?;
            let source = SoundController::resolve_source(path.as_deref());
            let mut controller = if mute {
                SoundController::new(RecordingBackend::new(), config.loop_restart_interval())?
            } else {
                SoundController::new(SystemBackend::new(), config.loop_restart_interval())?
            };
            controller.play_once(source.clone());
            std::thread::sleep(Duration::from_secs(seconds));
            controller.shutdown();
            print_json(&json!({ "played": source }))?;
        }
    }
    Ok(())
}

/// Path as it should be stored: relative when the file lives inside the data
/// directory, absolute otherwise.
fn stored_form(path: &Path, data_dir: &Path) -> std::io::Result<String> {
    let file = std::fs::canonicalize(path)?;
    let base = std::fs::canonicalize(data_dir)?;
    let stored = match file.strip_prefix(&base) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => file,
    };
    Ok(stored.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_inside_data_dir_is_stored_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sounds")).unwrap();
        let file = dir.path().join("sounds").join("chime.wav");
        std::fs::write(&file, b"RIFF").unwrap();

        let stored = stored_form(&file, dir.path()).unwrap();
        assert_eq!(Path::new(&stored), Path::new("sounds").join("chime.wav"));
    }

    #[test]
    fn file_outside_data_dir_is_stored_absolute() {
        let data = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("bell.wav");
        std::fs::write(&file, b"RIFF").unwrap();

        let stored = stored_form(&file, data.path()).unwrap();
        assert!(Path::new(&stored).is_absolute());
        assert_eq!(PathBuf::from(&stored), std::fs::canonicalize(&file).unwrap());
    }
}
