//! Reminder engine.
//!
//! [`ReminderEngine`] wires the poller, occurrence guard, notification
//! controller and sound controller around one [`ReminderStore`]. The shell
//! drives it: call [`ReminderEngine::tick`] once per poll period, show the
//! notifications it returns, and pass the user's choice back through
//! [`ReminderEngine::resolve`]. Nothing here spawns timers of its own.

mod guard;
mod notification;
mod poller;

pub use guard::OccurrenceGuard;
pub use notification::{
    ActiveNotification, NotificationController, Resolution, Resolved, MAX_SNOOZE_MINUTES,
};
pub use poller::{DuePoller, PollerState, ScanOutcome};

use std::path::PathBuf;

use chrono::{NaiveDateTime, Utc};

use crate::error::{CoreError, StoreError};
use crate::events::Event;
use crate::reminder::ReminderId;
use crate::sound::{AudioBackend, PlaybackMode, SoundController, SoundSource};
use crate::storage::{sound_file_path, Config, OneShotPolicy, ReminderStore};

/// Engine settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub after_dismiss: OneShotPolicy,
    pub sound_enabled: bool,
    pub loop_restart: std::time::Duration,
    /// Base for relative sound paths. `None` leaves them relative to the cwd.
    pub data_dir: Option<PathBuf>,
}

impl EngineOptions {
    pub fn from_config(config: &Config, data_dir: Option<PathBuf>) -> Self {
        Self {
            after_dismiss: config.reminders.after_dismiss,
            sound_enabled: config.sound.enabled,
            loop_restart: config.loop_restart_interval(),
            data_dir,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), None)
    }
}

/// Result of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Notifications that fired this tick.
    pub fired: Vec<ActiveNotification>,
    pub events: Vec<Event>,
    /// Set when the store could not be read; the pass was skipped.
    pub error: Option<StoreError>,
}

pub struct ReminderEngine<S: ReminderStore> {
    store: S,
    guard: OccurrenceGuard,
    poller: DuePoller,
    notifications: NotificationController,
    sound: SoundController,
    options: EngineOptions,
}

impl<S: ReminderStore> ReminderEngine<S> {
    /// Build an engine around `store`, playing alerts through `backend`.
    ///
    /// # Errors
    /// Returns an error if the sound worker thread cannot be spawned.
    pub fn new(
        store: S,
        backend: impl AudioBackend,
        options: EngineOptions,
    ) -> Result<Self, CoreError> {
        let sound = SoundController::new(backend, options.loop_restart)?;
        Ok(Self {
            store,
            guard: OccurrenceGuard::new(),
            poller: DuePoller::new(),
            notifications: NotificationController::new(options.after_dismiss),
            sound,
            options,
        })
    }

    /// Run one poll pass at `now` and register whatever fires.
    ///
    /// Store failures are reported in the returned [`TickReport`] and never
    /// stop the engine.
    pub fn tick(&mut self, now: NaiveDateTime) -> TickReport {
        let mut report = TickReport::default();
        let outcome = match self.poller.scan(&self.store, &mut self.guard, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "reminder scan failed; retrying next tick");
                report.events.push(Event::ScanFailed {
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                report.error = Some(e);
                return report;
            }
        };

        // Reported once per minute; the poll interval is usually shorter.
        let reported = outcome.malformed.iter().filter(|_| outcome.new_minute);
        for skipped in reported {
            report.events.push(Event::RecordSkipped {
                reason: skipped.to_string(),
                at: Utc::now(),
            });
        }
        if outcome.due.is_empty() {
            return report;
        }

        let source = self.alert_source();
        for reminder in outcome.due {
            let notification = self.notifications.on_reminder_due(
                reminder,
                now,
                &mut self.sound,
                source.clone(),
            );
            let r = &notification.reminder;
            report.events.push(Event::ReminderFired {
                id: r.id,
                title: r.title.clone(),
                message: r.message.clone(),
                due_time: r.due_time,
                recurrence: r.recurrence,
                at: Utc::now(),
            });
            if let Some(source) = &source {
                report.events.push(Event::SoundStarted {
                    mode: PlaybackMode::Loop,
                    source: source.clone(),
                    at: Utc::now(),
                });
            }
            report.fired.push(notification);
        }
        report
    }

    /// Resolve a notification returned by [`tick`](Self::tick).
    pub fn resolve(
        &mut self,
        notification: &ActiveNotification,
        resolution: Resolution,
        now: NaiveDateTime,
    ) -> Result<Resolved, CoreError> {
        self.resolve_id(notification.id(), resolution, now)
    }

    pub fn resolve_id(
        &mut self,
        id: ReminderId,
        resolution: Resolution,
        now: NaiveDateTime,
    ) -> Result<Resolved, CoreError> {
        self.notifications.resolve(
            id,
            resolution,
            now,
            &self.store,
            &mut self.guard,
            &mut self.sound,
        )
    }

    /// Active notifications in id order.
    pub fn active_notifications(&self) -> Vec<ActiveNotification> {
        self.notifications.active().cloned().collect()
    }

    /// Play the configured alert once. Any running loop is stopped first.
    pub fn test_sound(&mut self) -> SoundSource {
        let source = self.configured_source();
        self.notifications.detach_sound();
        self.sound.play_once(source.clone());
        source
    }

    pub fn stop_sound(&mut self) {
        self.sound.stop();
        self.notifications.detach_sound();
    }

    /// Force-dismiss every active notification, stop sound and join the
    /// sound worker. The engine should not be ticked afterwards.
    pub fn shutdown(&mut self, now: NaiveDateTime) -> Vec<Resolved> {
        let resolved =
            self.notifications
                .shutdown(now, &self.store, &mut self.guard, &mut self.sound);
        self.sound.shutdown();
        tracing::info!(dismissed = resolved.len(), "engine shut down");
        resolved
    }

    fn alert_source(&self) -> Option<SoundSource> {
        self.options
            .sound_enabled
            .then(|| self.configured_source())
    }

    /// Preferred source from the `sound_file` setting. Read errors fall back
    /// to the platform alias.
    fn configured_source(&self) -> SoundSource {
        let base = self.options.data_dir.clone().unwrap_or_default();
        match sound_file_path(&self.store, &base) {
            Ok(path) => SoundController::resolve_source(path.as_deref()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read sound setting");
                SoundSource::PlatformAlias
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn guard(&self) -> &OccurrenceGuard {
        &self.guard
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn sound_mode(&self) -> Option<PlaybackMode> {
        self.sound.mode()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
}
