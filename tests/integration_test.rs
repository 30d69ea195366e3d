// Integration tests for the local store, the drawer and config persistence

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use conference_timetable::models::commit::{CommitResponse, MoveToSession};
use conference_timetable::models::config::AppConfig;
use conference_timetable::models::view::{DetailLevel, LayoutKind};
use conference_timetable::services::backend::local::LocalBackend;
use conference_timetable::services::backend::TimetableBackend;
use conference_timetable::services::dispatch::{Dispatcher, Job, JobResult};
use conference_timetable::services::layout::LayoutOptions;
use conference_timetable::services::quantize::{DragEdge, DropOutcome, GridTime, RejectReason};
use conference_timetable::services::settings::{SettingsService, CONFIG_PATH_ENV};
use conference_timetable::services::timetable::TimetableDrawer;
use conference_timetable::ui_egui::commands::{HistoryStep, UndoManager};
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempfile::TempDir;

use fixtures::{at, sample_timetable, DAY};

fn seeded_store(dir: &TempDir) -> (LocalBackend, String) {
    let path = dir.path().join("timetable.db").to_string_lossy().into_owned();
    let backend = LocalBackend::open(&path, "42").unwrap();
    backend.import_timetable(&sample_timetable()).unwrap();
    (backend, path)
}

fn drawer_for(backend: &LocalBackend) -> TimetableDrawer {
    TimetableDrawer::new(
        backend.fetch_timetable().unwrap(),
        LayoutOptions::default(),
        LayoutKind::Compact,
        DetailLevel::Session,
        900.0,
    )
}

fn commit_of(outcome: Option<DropOutcome>) -> conference_timetable::models::commit::CommitRequest {
    match outcome {
        Some(DropOutcome::Commit(request)) => request,
        other => panic!("expected a commit, got {:?}", other),
    }
}

#[test]
fn test_imported_timetable_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (backend, path) = seeded_store(&dir);
    drop(backend);

    let reopened = LocalBackend::open(&path, "42").unwrap();
    let data = reopened.fetch_timetable().unwrap();
    assert_eq!(data, sample_timetable());
    assert_eq!(reopened.fetch_day(DAY).unwrap().len(), 5);
    assert!(reopened.fetch_day("20240514").unwrap().is_empty());
}

#[test]
fn test_drag_commit_roundtrip() {
    let dir = TempDir::new().unwrap();
    let (backend, path) = seeded_store(&dir);
    let mut drawer = drawer_for(&backend);
    assert_eq!(drawer.current_day(), Some(DAY));

    let request = commit_of(drawer.evaluate_drop("t3", DragEdge::Start, Some(GridTime::new(15, 0)), false));
    assert_eq!(request.start, at(15, 0));
    assert_eq!(request.end, at(15, 45));
    assert_eq!(request.previous_start, at(14, 0));

    drawer.begin_commit(request.clone());
    assert!(drawer.is_pending("t3"));
    assert_eq!(drawer.displayed_entry("t3").unwrap().start(), at(15, 0));

    let response = backend.commit_move(&request).unwrap();
    assert!(matches!(response, CommitResponse::Entry(_)));
    drawer.apply_commit(&request, response);
    assert!(!drawer.has_pending());
    assert_eq!(drawer.entry(DAY, "t3").unwrap().start(), at(15, 0));

    let reopened = LocalBackend::open(&path, "42").unwrap();
    assert_eq!(reopened.fetch_day(DAY).unwrap()["t3"].start(), at(15, 0));
}

#[test]
fn test_failed_commit_returns_to_confirmed_position() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let mut drawer = drawer_for(&backend);

    let request = commit_of(drawer.evaluate_drop("t3", DragEdge::End, Some(GridTime::new(15, 30)), false));
    drawer.begin_commit(request);
    assert_eq!(drawer.displayed_entry("t3").unwrap().end(), at(15, 30));

    drawer.fail_commit("t3");
    assert!(!drawer.is_pending("t3"));
    assert_eq!(drawer.displayed_entry("t3").unwrap().end(), at(14, 45));
}

#[test]
fn test_drops_outside_the_day_snap_back() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let drawer = drawer_for(&backend);

    let cases = [
        (DragEdge::Start, None, RejectReason::NoTime),
        (DragEdge::Start, Some(GridTime::new(0, 30)), RejectReason::Midnight),
        (DragEdge::Start, Some(GridTime::new(7, 0)), RejectReason::BeforeDayStart),
        (DragEdge::End, Some(GridTime::new(13, 0)), RejectReason::EndBeforeStart),
        (DragEdge::Start, Some(GridTime::new(14, 0)), RejectReason::Unchanged),
    ];
    for (edge, time, reason) in cases {
        assert_eq!(
            drawer.evaluate_drop("t3", edge, time, false),
            Some(DropOutcome::SnapBack(reason)),
            "{:?} at {:?}",
            edge,
            time
        );
    }
    assert_eq!(drawer.evaluate_drop("missing", DragEdge::Start, Some(GridTime::new(9, 0)), false), None);
}

#[test]
fn test_shift_later_moves_following_entries() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let mut drawer = drawer_for(&backend);

    let request = commit_of(drawer.evaluate_drop("t1", DragEdge::End, Some(GridTime::new(10, 45)), true));
    assert!(request.shift_later);
    drawer.begin_commit(request.clone());

    let response = backend.commit_move(&request).unwrap();
    let CommitResponse::Day { day, entries } = &response else {
        panic!("expected the whole day, got {:?}", response);
    };
    assert_eq!(day, DAY);
    assert_eq!(entries["b1"].start(), at(11, 15));
    assert_eq!(entries["t3"].start(), at(14, 15));
    // Started before the old end, so it stays
    assert_eq!(entries["t2"].start(), at(10, 15));

    drawer.apply_commit(&request, response);
    assert_eq!(drawer.entry(DAY, "t1").unwrap().end(), at(10, 45));
    assert_eq!(drawer.entry(DAY, "b1").unwrap().start(), at(11, 15));
}

#[test]
fn test_move_into_session_slot() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let mut drawer = drawer_for(&backend);

    let request = MoveToSession {
        entry_id: "t1".to_string(),
        day: DAY.to_string(),
        session_id: "1".to_string(),
        session_slot_id: "1".to_string(),
    };
    let entries = backend.move_to_session(&request).unwrap();
    assert!(!entries.contains_key("t1"));
    assert!(entries["s1"].entries.contains_key("t1"));
    assert_eq!(entries["s1"].entries["t1"].session_id.as_deref(), Some("1"));

    drawer.replace_day(DAY, entries);
    assert!(drawer.entry(DAY, "t1").is_some());

    let into_itself = MoveToSession {
        entry_id: "s1".to_string(),
        ..request
    };
    assert!(backend.move_to_session(&into_itself).is_err());
}

#[test]
fn test_dispatcher_runs_jobs_off_thread() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let backend = Arc::new(backend);
    let mut dispatcher = Dispatcher::new(backend.clone(), backend);

    dispatcher.submit(Job::FetchDay(DAY.to_string()));
    assert!(dispatcher.is_busy());

    match dispatcher.wait(Duration::from_secs(5)) {
        Some(JobResult::Day { day, result }) => {
            assert_eq!(day, DAY);
            assert_eq!(result.unwrap().len(), 5);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(!dispatcher.is_busy());
    assert_eq!(dispatcher.in_flight(), 0);
}

#[test]
fn test_undo_redo_follow_server_confirmations() {
    let dir = TempDir::new().unwrap();
    let (backend, _path) = seeded_store(&dir);
    let mut drawer = drawer_for(&backend);
    let mut history = UndoManager::new();

    let moved = commit_of(drawer.evaluate_drop("t3", DragEdge::Start, Some(GridTime::new(16, 0)), false));
    let response = backend.commit_move(&moved).unwrap();
    drawer.apply_commit(&moved, response);
    history.confirm(HistoryStep::Record, &moved);
    assert!(history.can_undo());

    let undo = history.undo_request().unwrap();
    assert_eq!(undo.start, at(14, 0));
    assert_eq!(undo.end, at(14, 45));
    // Nothing moves in the history until the server answers
    assert!(history.can_undo());
    assert!(!history.can_redo());

    let response = backend.commit_move(&undo).unwrap();
    drawer.apply_commit(&undo, response);
    history.confirm(HistoryStep::Undo, &undo);
    assert_eq!(drawer.entry(DAY, "t3").unwrap().start(), at(14, 0));
    assert!(!history.can_undo());

    let redo = history.redo_request().unwrap();
    assert_eq!(redo.start, at(16, 0));
    history.confirm(HistoryStep::Redo, &redo);
    assert!(history.can_undo());
    assert!(!history.can_redo());
}

#[test]
fn test_settings_persistence() {
    let dir = TempDir::new().unwrap();
    let service = SettingsService::new(dir.path().join("nested").join("config.toml"));

    assert_eq!(service.load().unwrap(), AppConfig::default());

    let config = AppConfig {
        conference_id: "1234".to_string(),
        default_layout: LayoutKind::Room,
        default_detail: DetailLevel::Contribution,
        day_start_hour: 9,
        batch_delay_ms: 250,
        theme: "dark".to_string(),
        ..AppConfig::default()
    };
    service.save(&config).unwrap();
    assert_eq!(service.load().unwrap(), config);

    service.reset().unwrap();
    assert_eq!(service.load().unwrap(), AppConfig::default());
}

#[test]
fn test_invalid_config_is_not_saved() {
    let dir = TempDir::new().unwrap();
    let service = SettingsService::new(dir.path().join("config.toml"));

    let config = AppConfig {
        day_start_hour: 30,
        ..AppConfig::default()
    };
    assert!(service.save(&config).is_err());
    assert!(!service.path().exists());

    std::fs::write(service.path(), "day_start_hour = \"eight\"").unwrap();
    assert!(service.load().is_err());
    assert_eq!(service.load_or_default(), AppConfig::default());
}

#[test]
#[serial]
fn test_config_path_from_environment() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("override.toml");
    std::env::set_var(CONFIG_PATH_ENV, &path);

    let service = SettingsService::from_env().unwrap();
    assert_eq!(service.path(), path.as_path());

    std::env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_blank_config_override_is_ignored() {
    std::env::set_var(CONFIG_PATH_ENV, "  ");
    if let Ok(service) = SettingsService::from_env() {
        assert!(service.path().ends_with("config.toml"));
    }
    std::env::remove_var(CONFIG_PATH_ENV);
}
