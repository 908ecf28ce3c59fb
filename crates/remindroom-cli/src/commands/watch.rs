//! Foreground engine loop.
//!
//! Ticks the engine on the configured interval, prints every event as one
//! JSON line on stdout, and takes resolutions as text commands on stdin.
//! Ctrl-C, `quit`, end of input or a closed stdout shuts the engine down,
//! which dismisses whatever is still open.

use std::fmt::Display;
use std::io::Write;

use clap::Args;
use remindroom_core::engine::Resolution;
use remindroom_core::storage::data_dir;
use remindroom_core::{
    Config, EngineOptions, Event, RecordingBackend, ReminderDb, ReminderEngine, SystemBackend,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use super::CmdResult;

#[derive(Args)]
pub struct WatchArgs {
    /// Fire notifications without playing any sound
    #[arg(long)]
    pub mute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchCommand {
    Dismiss(i64),
    /// Minutes default to `notifications.default_snooze_minutes`.
    Snooze(i64, Option<i64>),
    List,
    TestSound,
    StopSound,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<WatchCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let id = |arg: Option<&str>| -> Result<i64, String> {
        let arg = arg.ok_or_else(|| format!("{verb}: missing reminder id"))?;
        arg.parse().map_err(|_| format!("{verb}: invalid reminder id '{arg}'"))
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "dismiss" => WatchCommand::Dismiss(id(words.next())?),
        "snooze" => {
            let target = id(words.next())?;
            let minutes = match words.next() {
                Some(m) => Some(
                    m.parse()
                        .map_err(|_| format!("snooze: invalid minutes '{m}'"))?,
                ),
                None => None,
            };
            WatchCommand::Snooze(target, minutes)
        }
        "list" => WatchCommand::List,
        "test-sound" => WatchCommand::TestSound,
        "stop-sound" => WatchCommand::StopSound,
        "quit" | "exit" => WatchCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    if let Some(extra) = words.next() {
        return Err(format!("{verb}: unexpected argument '{extra}'"));
    }
    Ok(Some(command))
}

/// JSON-lines writer for stdout. The first failed write marks the sink
/// broken and later events are dropped.
#[derive(Default)]
struct EventSink {
    broken: bool,
}

impl EventSink {
    fn emit<T: Serialize + ?Sized>(&mut self, value: &T) {
        if self.broken {
            return;
        }
        if let Err(e) = write_line(&mut std::io::stdout().lock(), value) {
            tracing::warn!(error = %e, "stdout closed; shutting down");
            self.broken = true;
        }
    }
}

fn write_line<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn report(message: impl Display) {
    let _ = writeln!(std::io::stderr(), "error: {message}");
}

pub fn run(args: WatchArgs) -> CmdResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(args))
}

async fn watch(args: WatchArgs) -> CmdResult {
    let config = Config::load_or_default();
    let options = EngineOptions::from_config(&config, Some(data_dir()?));
    let db = ReminderDb::open()?;
    let mut engine = if args.mute {
        ReminderEngine::new(db, RecordingBackend::new(), options)?
    } else {
        ReminderEngine::new(db, SystemBackend::new(), options)?
    };
    let default_snooze = i64::from(config.notifications.default_snooze_minutes);

    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!(tick_ms = config.poller.tick_ms, mute = args.mute, "watching reminders");

    let mut sink = EventSink::default();
    while !sink.broken {
        tokio::select! {
            _ = ticker.tick() => {
                let tick = engine.tick(super::now());
                for event in &tick.events {
                    sink.emit(event);
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        report(message);
                        continue;
                    }
                };
                match command {
                    WatchCommand::Quit => break,
                    WatchCommand::List => sink.emit(&engine.active_notifications()),
                    WatchCommand::TestSound => {
                        let source = engine.test_sound();
                        sink.emit(&Event::SoundStarted {
                            mode: remindroom_core::PlaybackMode::OneShot,
                            source,
                            at: chrono::Utc::now(),
                        });
                    }
                    WatchCommand::StopSound => {
                        engine.stop_sound();
                        sink.emit(&Event::SoundStopped { at: chrono::Utc::now() });
                    }
                    WatchCommand::Dismiss(id) => {
                        match engine.resolve_id(id, Resolution::Dismiss, super::now()) {
                            Ok(resolved) => sink.emit(&resolved.to_event()),
                            Err(e) => report(e),
                        }
                    }
                    WatchCommand::Snooze(id, minutes) => {
                        let minutes = minutes.unwrap_or(default_snooze);
                        match engine.resolve_id(id, Resolution::Snooze(minutes), super::now()) {
                            Ok(resolved) => sink.emit(&resolved.to_event()),
                            Err(e) => report(e),
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                break;
            }
        }
    }

    let resolved = engine.shutdown(super::now());
    for r in &resolved {
        sink.emit(&r.to_event());
    }
    sink.emit(&Event::EngineShutdown {
        dismissed: resolved.len(),
        at: chrono::Utc::now(),
    });
    Ok(())
}
