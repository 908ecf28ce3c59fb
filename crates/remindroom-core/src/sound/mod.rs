//! Alert sound playback.
//!
//! [`SoundController`] is the only way the engine touches audio. It forwards
//! Stop/Play commands over a channel to a worker thread that owns the
//! [`AudioBackend`], so starting or stopping a sound never blocks the poller.
//! Commands are handled in FIFO order: every new playback is preceded by a
//! Stop, and at most one loop plays at any time.

mod backend;

pub use backend::{AudioBackend, BackendCall, Playback, RecordingBackend, SystemBackend};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where an alert sound comes from, in fallback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundSource {
    /// User-configured sound file.
    File(PathBuf),
    /// The platform's stock alert sound.
    PlatformAlias,
    /// Terminal bell; always available.
    Bell,
}

impl SoundSource {
    /// Next source to try when this one cannot be played.
    pub fn fallback(&self) -> Option<SoundSource> {
        match self {
            SoundSource::File(_) => Some(SoundSource::PlatformAlias),
            SoundSource::PlatformAlias => Some(SoundSource::Bell),
            SoundSource::Bell => None,
        }
    }
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundSource::File(path) => write!(f, "file:{}", path.display()),
            SoundSource::PlatformAlias => f.write_str("platform-alias"),
            SoundSource::Bell => f.write_str("bell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Repeats until stopped; used while a notification is fired.
    Loop,
    /// Plays one pass; used by the sound test.
    OneShot,
}

enum Command {
    Play {
        source: SoundSource,
        mode: PlaybackMode,
    },
    Stop,
    Sync(Sender<()>),
}

/// Start/stop interface over the sound worker.
pub struct SoundController {
    tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    mode: Option<PlaybackMode>,
}

impl SoundController {
    /// Spawn the worker thread around `backend`.
    ///
    /// `loop_poll` is how often a looping sound checks whether its pass ended.
    ///
    /// # Errors
    /// Returns an error if the worker thread cannot be spawned.
    pub fn new(backend: impl AudioBackend, loop_poll: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let backend: Box<dyn AudioBackend> = Box::new(backend);
        let worker = std::thread::Builder::new()
            .name("remindroom-sound".into())
            .spawn(move || run_worker(backend, rx, loop_poll))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            mode: None,
        })
    }

    /// Pick the preferred source: the custom file when it exists, otherwise
    /// the platform alias. The worker falls back further if playback fails.
    pub fn resolve_source(custom: Option<&Path>) -> SoundSource {
        match custom {
            Some(path) if path.is_file() => SoundSource::File(path.to_path_buf()),
            Some(path) => {
                tracing::warn!(path = %path.display(), "custom sound file missing, using platform sound");
                SoundSource::PlatformAlias
            }
            None => SoundSource::PlatformAlias,
        }
    }

    /// Stop whatever plays, then loop `source` until [`stop`](Self::stop).
    pub fn start_loop(&mut self, source: SoundSource) {
        self.start(source, PlaybackMode::Loop);
    }

    /// Stop whatever plays, then play `source` once.
    pub fn play_once(&mut self, source: SoundSource) {
        self.start(source, PlaybackMode::OneShot);
    }

    fn start(&mut self, source: SoundSource, mode: PlaybackMode) {
        tracing::debug!(%source, ?mode, "sound start");
        self.send(Command::Stop);
        self.send(Command::Play { source, mode });
        self.mode = Some(mode);
    }

    /// Stop playback. Stopping when nothing plays is a no-op.
    pub fn stop(&mut self) {
        if self.mode.take().is_some() {
            tracing::debug!("sound stop");
            self.send(Command::Stop);
        }
    }

    /// Mode of the playback last started and not yet stopped.
    pub fn mode(&self) -> Option<PlaybackMode> {
        self.mode
    }

    pub fn is_looping(&self) -> bool {
        self.mode == Some(PlaybackMode::Loop)
    }

    /// Block until the worker has handled every command sent so far.
    pub fn sync(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.send(Command::Sync(ack_tx)) {
            let _ = ack_rx.recv();
        }
    }

    /// Stop playback and join the worker. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.stop();
        // Dropping the sender ends the worker loop after it drains the queue.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("sound worker panicked");
            }
        }
    }

    fn send(&self, cmd: Command) -> bool {
        match &self.tx {
            Some(tx) => {
                if tx.send(cmd).is_err() {
                    tracing::warn!("sound worker is gone; command dropped");
                    return false;
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for SoundController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(mut backend: Box<dyn AudioBackend>, rx: Receiver<Command>, loop_poll: Duration) {
    let mut looping: Option<SoundSource> = None;

    loop {
        let next = if looping.is_some() {
            rx.recv_timeout(loop_poll)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match next {
            Ok(Command::Play { source, mode }) => {
                let playing = start_with_fallback(backend.as_mut(), source);
                looping = (mode == PlaybackMode::Loop).then_some(playing);
            }
            Ok(Command::Stop) => {
                backend.stop();
                looping = None;
            }
            Ok(Command::Sync(ack)) => {
                let _ = ack.send(());
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(source) = looping.take() {
                    let next_source = match backend.poll() {
                        Playback::Playing => source,
                        Playback::Finished => start_with_fallback(backend.as_mut(), source),
                        Playback::Failed(reason) => {
                            tracing::warn!(%source, %reason, "alert sound failed, falling back");
                            let fallback = source.fallback().unwrap_or(SoundSource::Bell);
                            start_with_fallback(backend.as_mut(), fallback)
                        }
                    };
                    looping = Some(next_source);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                backend.stop();
                break;
            }
        }
    }
}

/// Start `source`, walking the fallback chain on failure. Returns the source
/// that actually started.
fn start_with_fallback(backend: &mut dyn AudioBackend, mut source: SoundSource) -> SoundSource {
    loop {
        match backend.start(&source) {
            Ok(()) => return source,
            Err(e) => {
                tracing::warn!(error = %e, "sound source unavailable");
                match source.fallback() {
                    Some(next) => source = next,
                    None => return source,
                }
            }
        }
    }
}
