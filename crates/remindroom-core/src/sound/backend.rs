//! Audio backends driven by the sound worker.
//!
//! [`SystemBackend`] shells out to the platform's command-line player, the
//! same way desktop timers do it without linking an audio stack.
//! [`RecordingBackend`] is silent and keeps a log of every call.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::SoundSource;
use crate::error::SoundError;

/// State of the current playback pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    Playing,
    /// The pass ended normally (or nothing was playing).
    Finished,
    /// The player exited abnormally; the source should be treated as unavailable.
    Failed(String),
}

/// A device that plays one pass of a sound source at a time.
///
/// Only the sound worker thread calls into a backend.
pub trait AudioBackend: Send + 'static {
    /// Begin one pass of `source`. `SoundSource::Bell` must not fail.
    fn start(&mut self, source: &SoundSource) -> Result<(), SoundError>;

    fn poll(&mut self) -> Playback;

    /// Stop the current pass. No-op when idle.
    fn stop(&mut self);
}

/// Candidate player commands for a source, most preferred first.
type PlayerList = fn(&SoundSource) -> Vec<Command>;

/// Plays through external player processes.
///
/// Each source has a list of candidate players. A player that fails to spawn
/// or exits abnormally hands over to the next candidate for the same source;
/// the source only fails once every candidate has. The last working candidate
/// is remembered so loop restarts skip players already known to fail.
pub struct SystemBackend {
    child: Option<Child>,
    players: PlayerList,
    /// Source being played and the index of the candidate playing it.
    current: Option<(SoundSource, usize)>,
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self {
            child: None,
            players: platform_players,
            current: None,
        }
    }
}

impl std::fmt::Debug for SystemBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemBackend")
            .field("child", &self.child.as_ref().map(Child::id))
            .field("current", &self.current)
            .finish()
    }
}

impl SystemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_players(players: PlayerList) -> Self {
        Self {
            child: None,
            players,
            current: None,
        }
    }

    /// Spawn the first candidate at or after `from`.
    fn spawn_from(&mut self, source: &SoundSource, from: usize) -> Result<(), SoundError> {
        let mut last_error = String::from("no player available on this platform");
        for (index, mut cmd) in (self.players)(source).into_iter().enumerate().skip(from) {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            match cmd.spawn() {
                Ok(child) => {
                    self.child = Some(child);
                    self.current = Some((source.clone(), index));
                    return Ok(());
                }
                Err(e) => {
                    last_error = format!("{:?}: {e}", cmd.get_program());
                }
            }
        }
        self.current = None;
        Err(SoundError::SourceUnavailable {
            source_name: source.to_string(),
            reason: last_error,
        })
    }

    /// The running player failed; move on to the next candidate.
    fn next_player(&mut self, reason: String) -> Playback {
        let Some((source, index)) = self.current.take() else {
            return Playback::Failed(reason);
        };
        tracing::debug!(%source, player = index, %reason, "player failed, trying next");
        match self.spawn_from(&source, index + 1) {
            Ok(()) => Playback::Playing,
            Err(_) => Playback::Failed(reason),
        }
    }
}

impl AudioBackend for SystemBackend {
    fn start(&mut self, source: &SoundSource) -> Result<(), SoundError> {
        match source {
            SoundSource::File(path) if !path.is_file() => Err(SoundError::SourceUnavailable {
                source_name: path.display().to_string(),
                reason: "file does not exist".to_string(),
            }),
            SoundSource::Bell => {
                let mut err = std::io::stderr();
                let _ = err.write_all(b"\x07");
                let _ = err.flush();
                Ok(())
            }
            _ => {
                let from = match &self.current {
                    Some((playing, index)) if playing == source => *index,
                    _ => 0,
                };
                self.spawn_from(source, from)
            }
        }
    }

    fn poll(&mut self) -> Playback {
        let Some(child) = self.child.as_mut() else {
            return Playback::Finished;
        };
        match child.try_wait() {
            Ok(None) => Playback::Playing,
            Ok(Some(status)) => {
                self.child = None;
                if status.success() {
                    Playback::Finished
                } else {
                    self.next_player(format!("player exited with {status}"))
                }
            }
            Err(e) => {
                self.child = None;
                self.next_player(e.to_string())
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for SystemBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn platform_players(source: &SoundSource) -> Vec<Command> {
    match source {
        SoundSource::File(path) => file_players(path),
        SoundSource::PlatformAlias => alias_players(),
        SoundSource::Bell => Vec::new(),
    }
}

#[cfg(target_os = "macos")]
fn file_players(path: &Path) -> Vec<Command> {
    let mut afplay = Command::new("afplay");
    afplay.arg(path);
    vec![afplay]
}

#[cfg(target_os = "macos")]
fn alias_players() -> Vec<Command> {
    ["/System/Library/Sounds/Glass.aiff", "/System/Library/Sounds/Ping.aiff"]
        .iter()
        .filter(|p| Path::new(p).exists())
        .map(|p| {
            let mut afplay = Command::new("afplay");
            afplay.arg(p);
            afplay
        })
        .collect()
}

#[cfg(windows)]
fn file_players(path: &Path) -> Vec<Command> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Vec::new();
    }
    let escaped = path.display().to_string().replace('\'', "''");
    let mut ps = Command::new("powershell");
    ps.args([
        "-NoProfile",
        "-Command",
        &format!("(New-Object Media.SoundPlayer '{escaped}').PlaySync()"),
    ]);
    vec![ps]
}

#[cfg(windows)]
fn alias_players() -> Vec<Command> {
    let mut ps = Command::new("powershell");
    ps.args([
        "-NoProfile",
        "-Command",
        "[System.Media.SystemSounds]::Asterisk.Play(); Start-Sleep -Milliseconds 800",
    ]);
    vec![ps]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn file_players(path: &Path) -> Vec<Command> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

    let mut players = Vec::new();
    let mut paplay = Command::new("paplay");
    paplay.arg(path);
    players.push(paplay);
    if is_wav {
        let mut aplay = Command::new("aplay");
        aplay.arg("-q").arg(path);
        players.push(aplay);
    }
    let mut ffplay = Command::new("ffplay");
    ffplay
        .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
        .arg(path);
    players.push(ffplay);
    players
}

#[cfg(all(unix, not(target_os = "macos")))]
fn alias_players() -> Vec<Command> {
    const ALIASES: [(&str, &str); 4] = [
        ("paplay", "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"),
        ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
        ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
        ("aplay", "/usr/share/sounds/generic.wav"),
    ];
    ALIASES
        .iter()
        .filter(|(_, file)| Path::new(file).exists())
        .map(|(player, file)| {
            let mut cmd = Command::new(player);
            cmd.arg(file);
            cmd
        })
        .collect()
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum BackendCall {
    Start { source: SoundSource, ok: bool },
    Stop,
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<BackendCall>,
    playing: bool,
    fail_files: bool,
    fail_alias: bool,
}

/// Silent backend that records calls. Cloning shares the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make file and/or platform-alias sources fail to start.
    pub fn failing(fail_files: bool, fail_alias: bool) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.fail_files = fail_files;
            state.fail_alias = fail_alias;
        }
        backend
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Successful starts, in order.
    pub fn started_sources(&self) -> Vec<SoundSource> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Start { source, ok: true } => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    /// End the current pass as if the sound file ran out.
    pub fn finish_pass(&self) {
        self.lock().playing = false;
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioBackend for RecordingBackend {
    fn start(&mut self, source: &SoundSource) -> Result<(), SoundError> {
        let mut state = self.lock();
        let fails = match source {
            SoundSource::File(_) => state.fail_files,
            SoundSource::PlatformAlias => state.fail_alias,
            SoundSource::Bell => false,
        };
        state.calls.push(BackendCall::Start {
            source: source.clone(),
            ok: !fails,
        });
        if fails {
            return Err(SoundError::SourceUnavailable {
                source_name: source.to_string(),
                reason: "configured to fail".to_string(),
            });
        }
        // A bell is a single beep, over as soon as it starts.
        state.playing = !matches!(source, SoundSource::Bell);
        Ok(())
    }

    fn poll(&mut self) -> Playback {
        if self.lock().playing {
            Playback::Playing
        } else {
            Playback::Finished
        }
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.calls.push(BackendCall::Stop);
        state.playing = false;
    }
}
