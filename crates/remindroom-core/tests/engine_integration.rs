//! Integration tests for the reminder engine.
//!
//! Runs the full tick → fire → resolve cycle against an on-disk database,
//! with a second connection standing in for the CLI editing reminders while
//! the engine runs.

use std::time::Duration;

use chrono::NaiveDateTime;
use remindroom_core::sound::BackendCall;
use remindroom_core::storage::OneShotPolicy;
use remindroom_core::{
    DueTime, EngineOptions, NewReminder, Recurrence, RecordingBackend, ReminderDb,
    ReminderEngine, ReminderPatch, ReminderStore, Resolution, Resolved,
};

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn due(s: &str) -> DueTime {
    DueTime::parse(s).unwrap()
}

struct Harness {
    engine: ReminderEngine<ReminderDb>,
    backend: RecordingBackend,
    db_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(after_dismiss: OneShotPolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("remindroom.db");
        let backend = RecordingBackend::new();
        let options = EngineOptions {
            after_dismiss,
            sound_enabled: true,
            loop_restart: Duration::from_millis(5),
            data_dir: Some(dir.path().to_path_buf()),
        };
        let engine =
            ReminderEngine::new(ReminderDb::open_at(&db_path).unwrap(), backend.clone(), options)
                .unwrap();
        Self {
            engine,
            backend,
            db_path,
            _dir: dir,
        }
    }

    /// A second connection, like a CLI process would open.
    fn other_process(&self) -> ReminderDb {
        ReminderDb::open_at(&self.db_path).unwrap()
    }

    fn add(&self, title: &str, due_time: &str, recurrence: Recurrence) -> i64 {
        self.other_process()
            .create(&NewReminder {
                title: title.into(),
                message: None,
                due_time: due(due_time),
                recurrence,
            })
            .unwrap()
            .id
    }
}

#[test]
fn test_weekly_snooze_then_dismiss() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("water plants", "2024-03-01 08:00", Recurrence::Weekly);

    assert!(h.engine.tick(at("2024-03-01 07:59:59")).fired.is_empty());

    let report = h.engine.tick(at("2024-03-01 08:00:30"));
    assert_eq!(report.fired.len(), 1);
    let notification = report.fired[0].clone();

    let snoozed = h
        .engine
        .resolve(&notification, Resolution::Snooze(10), at("2024-03-01 08:00:40"))
        .unwrap();
    assert_eq!(
        snoozed,
        Resolved::Snoozed {
            id,
            minutes: 10,
            due_time: due("2024-03-01 08:10")
        }
    );

    // Nothing until the snoozed minute.
    for s in ["2024-03-01 08:01:00", "2024-03-01 08:05:00", "2024-03-01 08:09:59"] {
        assert!(h.engine.tick(at(s)).fired.is_empty(), "fired early at {s}");
    }

    let report = h.engine.tick(at("2024-03-01 08:10:00"));
    assert_eq!(report.fired.len(), 1);

    let dismissed = h
        .engine
        .resolve_id(id, Resolution::Dismiss, at("2024-03-01 08:11:00"))
        .unwrap();
    assert_eq!(
        dismissed,
        Resolved::Dismissed {
            id,
            next_due: Some(due("2024-03-08 08:10")),
            disabled: false
        }
    );

    let stored = h.other_process().get(id).unwrap();
    assert_eq!(stored.due_time, due("2024-03-08 08:10"));
    assert_eq!(stored.recurrence, Recurrence::Weekly);
    assert!(stored.enabled);
}

#[test]
fn test_dismiss_daily_rolls_over() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("standup", "2024-01-10 09:00", Recurrence::Daily);
    let report = h.engine.tick(at("2024-01-10 09:00:00"));
    h.engine
        .resolve(&report.fired[0], Resolution::Dismiss, at("2024-01-10 09:00:20"))
        .unwrap();

    let stored = h.other_process().get(id).unwrap();
    assert_eq!(stored.due_time, due("2024-01-11 09:00"));
    assert!(stored.enabled);

    // Not due again until tomorrow.
    assert!(h.engine.tick(at("2024-01-10 23:59:00")).fired.is_empty());
    assert_eq!(h.engine.tick(at("2024-01-11 09:00:00")).fired.len(), 1);
}

#[test]
fn test_overlapping_fires_never_leave_two_loops() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    h.add("first", "2024-03-01 08:00", Recurrence::None);
    h.add("second", "2024-03-01 08:01", Recurrence::None);

    assert_eq!(h.engine.tick(at("2024-03-01 08:00:00")).fired.len(), 1);
    assert_eq!(h.engine.tick(at("2024-03-01 08:01:00")).fired.len(), 1);
    h.engine.stop_sound();
    h.engine.shutdown(at("2024-03-01 08:02:00"));

    let mut playing = false;
    for call in h.backend.calls() {
        match call {
            BackendCall::Stop => playing = false,
            BackendCall::Start { ok: true, .. } => {
                assert!(!playing, "second loop started while one was playing");
                playing = true;
            }
            BackendCall::Start { ok: false, .. } => {}
        }
    }
    assert!(!h.backend.is_playing());
}

#[test]
fn test_shutdown_persists_recurring_advance() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("pay rent", "2024-02-01 10:00", Recurrence::Monthly);
    assert_eq!(h.engine.tick(at("2024-02-01 10:00:00")).fired.len(), 1);

    let resolved = h.engine.shutdown(at("2024-02-01 10:03:00"));
    assert_eq!(resolved.len(), 1);
    assert!(h.engine.active_notifications().is_empty());
    assert!(!h.backend.is_playing());
    assert_eq!(h.backend.calls().last(), Some(&BackendCall::Stop));

    let stored = h.other_process().get(id).unwrap();
    assert_eq!(stored.due_time, due("2024-03-02 10:00"));
}

#[test]
fn test_external_edit_rearms_fired_reminder() {
    let mut h = Harness::new(OneShotPolicy::Keep);
    let id = h.add("call mom", "2024-03-01 08:00", Recurrence::None);
    assert_eq!(h.engine.tick(at("2024-03-01 08:00:00")).fired.len(), 1);
    h.engine
        .resolve_id(id, Resolution::Dismiss, at("2024-03-01 08:00:10"))
        .unwrap();

    // Keep policy: unchanged record stays quiet.
    assert!(h.engine.tick(at("2024-03-01 08:01:00")).fired.is_empty());

    // The user moves it forward from another process.
    h.other_process()
        .update(
            id,
            &ReminderPatch {
                due_time: Some(due("2024-03-01 08:05")),
                ..ReminderPatch::default()
            },
        )
        .unwrap();
    assert!(h.engine.tick(at("2024-03-01 08:02:00")).fired.is_empty());
    assert_eq!(h.engine.tick(at("2024-03-01 08:05:00")).fired.len(), 1);
}

#[test]
fn test_overdue_reminders_fire_on_first_tick() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let a = h.add("yesterday", "2024-02-29 18:00", Recurrence::None);
    let b = h.add("this morning", "2024-03-01 07:00", Recurrence::Daily);
    h.add("later", "2024-03-01 12:00", Recurrence::None);

    let report = h.engine.tick(at("2024-03-01 08:00:00"));
    let ids: Vec<_> = report.fired.iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec![a, b]);

    // An overdue recurring reminder advances one step per dismiss.
    h.engine
        .resolve_id(b, Resolution::Dismiss, at("2024-03-01 08:00:30"))
        .unwrap();
    assert_eq!(
        h.other_process().get(b).unwrap().due_time,
        due("2024-03-02 07:00")
    );
}

#[test]
fn test_deleted_while_fired_vanishes() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("temp", "2024-03-01 08:00", Recurrence::Daily);
    h.engine.tick(at("2024-03-01 08:00:00"));
    h.other_process().delete(id).unwrap();

    let resolved = h
        .engine
        .resolve_id(id, Resolution::Snooze(5), at("2024-03-01 08:00:30"))
        .unwrap();
    assert_eq!(resolved, Resolved::Vanished { id });
    assert!(h.engine.active_notifications().is_empty());
    assert!(h.engine.tick(at("2024-03-01 08:06:00")).fired.is_empty());
}

#[test]
fn test_disabled_elsewhere_stops_future_fires() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("gym", "2024-03-01 08:00", Recurrence::None);
    h.other_process().set_enabled(id, false).unwrap();
    assert!(h.engine.tick(at("2024-03-01 08:00:00")).fired.is_empty());

    h.other_process().set_enabled(id, true).unwrap();
    assert_eq!(h.engine.tick(at("2024-03-01 08:00:05")).fired.len(), 1);
    assert!(h.engine.store().get(id).unwrap().enabled);
}

fn reschedule(db: &ReminderDb, id: i64, due_time: &str) {
    db.update(
        id,
        &ReminderPatch {
            due_time: Some(due(due_time)),
            ..ReminderPatch::default()
        },
    )
    .unwrap();
}

#[test]
fn test_reschedule_while_fired_survives_stale_dismiss() {
    for policy in [OneShotPolicy::Disable, OneShotPolicy::Keep] {
        let mut h = Harness::new(policy);
        let id = h.add("dentist", "2024-03-01 08:00", Recurrence::None);
        assert_eq!(h.engine.tick(at("2024-03-01 08:00:00")).fired.len(), 1);

        reschedule(&h.other_process(), id, "2024-03-02 08:00");
        let resolved = h
            .engine
            .resolve_id(id, Resolution::Dismiss, at("2024-03-01 08:01:00"))
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::Superseded {
                id,
                due_time: due("2024-03-02 08:00")
            }
        );
        assert!(h.engine.active_notifications().is_empty());
        assert_eq!(h.engine.sound_mode(), None);

        let stored = h.other_process().get(id).unwrap();
        assert!(stored.enabled, "{policy:?} disabled the rescheduled reminder");
        assert_eq!(stored.due_time, due("2024-03-02 08:00"));

        assert!(h.engine.tick(at("2024-03-01 08:02:00")).fired.is_empty());
        let report = h.engine.tick(at("2024-03-02 08:00:00"));
        assert_eq!(report.fired.len(), 1, "{policy:?} lost the rescheduled occurrence");
        assert_eq!(report.fired[0].reminder.due_time, due("2024-03-02 08:00"));
    }
}

#[test]
fn test_recurring_edit_while_fired_keeps_new_occurrence() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("pills", "2024-03-01 08:00", Recurrence::Daily);
    assert_eq!(h.engine.tick(at("2024-03-01 08:00:00")).fired.len(), 1);

    reschedule(&h.other_process(), id, "2024-03-01 20:00");
    let resolved = h
        .engine
        .resolve_id(id, Resolution::Dismiss, at("2024-03-01 08:05:00"))
        .unwrap();
    assert!(matches!(resolved, Resolved::Superseded { .. }));
    assert_eq!(h.other_process().get(id).unwrap().due_time, due("2024-03-01 20:00"));

    assert_eq!(h.engine.tick(at("2024-03-01 20:00:00")).fired.len(), 1);
    h.engine
        .resolve_id(id, Resolution::Dismiss, at("2024-03-01 20:01:00"))
        .unwrap();
    assert_eq!(h.other_process().get(id).unwrap().due_time, due("2024-03-02 20:00"));
}

#[test]
fn test_shutdown_leaves_rescheduled_reminder_alone() {
    let mut h = Harness::new(OneShotPolicy::Disable);
    let id = h.add("report", "2024-03-01 08:00", Recurrence::Weekly);
    assert_eq!(h.engine.tick(at("2024-03-01 08:00:00")).fired.len(), 1);
    reschedule(&h.other_process(), id, "2024-03-04 09:00");

    let resolved = h.engine.shutdown(at("2024-03-01 08:10:00"));
    assert!(matches!(resolved[..], [Resolved::Superseded { .. }]));
    let stored = h.other_process().get(id).unwrap();
    assert_eq!(stored.due_time, due("2024-03-04 09:00"));
    assert!(stored.enabled);
}
