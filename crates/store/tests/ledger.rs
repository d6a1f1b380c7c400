use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;

use shotledger_engine::row::RawRow;
use shotledger_engine::{player_metrics, CorrectionPatch, GameFilter, ShotResult, Side};
use shotledger_store::{
    BlobSink, FileSink, GameKey, ImportOutcome, LedgerError, LedgerSnapshot, SinkError, Store,
    Workspace,
};

fn key(name: &str) -> GameKey {
    GameKey {
        name: name.into(),
        date: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
        team1: "Lions".into(),
        team2: "Tigers".into(),
    }
}

fn row(time: &str, team: &str, shooter: &str, result: &str, xg: &str) -> RawRow {
    RawRow::from_pairs([
        ("time", time),
        ("shooting_team", team),
        ("result", result),
        ("type", "Direct"),
        ("shooter", shooter),
        ("xg", xg),
        ("distance", "10"),
        ("angle", "15"),
        ("x", "400"),
        ("y", "150"),
        ("t1_lw", "Alice"),
        ("t1_g", "Gina"),
        ("t2_lw", "Xena"),
        ("t2_g", "Tom"),
    ])
}

fn batch() -> Vec<RawRow> {
    vec![
        row("01:10", "Lions", "Alice", "Goal", "0.3"),
        row("02:20", "Tigers", "Xena", "Saved", "0.1"),
        row("03:30", "Lions", "Alice", "Missed", "0.05"),
    ]
}

fn store_with_batch() -> (Store, i64) {
    let mut store = Store::open_in_memory().unwrap();
    let result = store.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    (store, result.game_id.unwrap())
}

// -------------------------------------------------------------------------
// Import
// -------------------------------------------------------------------------

#[test]
fn reimport_is_idempotent() {
    let (mut store, game_id) = store_with_batch();
    assert_eq!(store.raw_shot_count(GameFilter::All).unwrap(), 3);

    let again = store.import_shots(&key("lions  VS tigers"), &batch()).unwrap();
    assert_eq!(again.outcome, ImportOutcome::AllDuplicates);
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 3);
    assert_eq!(again.duplicate_samples.len(), 3);
    assert_eq!(again.game_id, Some(game_id));
    assert!(!again.game_created);
    assert_eq!(store.raw_shot_count(GameFilter::All).unwrap(), 3);
}

#[test]
fn duplicates_under_new_game_name_roll_back_the_game() {
    let (mut store, _) = store_with_batch();

    let result = store.import_shots(&key("Some other name"), &batch()).unwrap();
    assert_eq!(result.outcome, ImportOutcome::AllDuplicates);
    assert!(result.game_created);
    assert!(result.game_rolled_back);
    assert_eq!(result.game_id, None);
    assert_eq!(store.games().unwrap().len(), 1);
}

#[test]
fn formatting_differences_still_count_as_duplicates() {
    let (mut store, _) = store_with_batch();
    let reformatted = vec![row("01:10", "lions", "alice ", "Goal", "0.3000")];
    let result = store.import_shots(&key("Lions vs Tigers"), &reformatted).unwrap();
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.inserted, 0);
}

#[test]
fn duplicates_inside_one_batch_are_skipped() {
    let mut store = Store::open_in_memory().unwrap();
    let mut rows = batch();
    rows.push(row("01:10", "Lions", "Alice", "Goal", "0.3"));
    let result = store.import_shots(&key("Lions vs Tigers"), &rows).unwrap();
    assert_eq!(result.inserted, 3);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.duplicate_samples[0].row, 4);
}

#[test]
fn invalid_rows_are_rejected_and_the_rest_imported() {
    let mut store = Store::open_in_memory().unwrap();
    let mut rows = batch();
    rows.push(RawRow::from_pairs([("time", "9"), ("shooter", "Bob")]));
    rows.push(row("05:00", "Lions", "Alice", "Post", "0.1"));
    let result = store.import_shots(&key("Lions vs Tigers"), &rows).unwrap();
    assert_eq!(result.outcome, ImportOutcome::Inserted);
    assert_eq!(result.inserted, 3);
    assert_eq!(result.rejected.len(), 2);
    assert_eq!(result.rejected[0].row, 4);
    assert!(result.rejected[0].reason.contains("missing"));
}

#[test]
fn shooting_team_is_matched_to_the_game_teams() {
    let mut store = Store::open_in_memory().unwrap();
    let rows = vec![
        row("01:10", "Lions", "Alice", "Goal", "0.3"),
        row("02:20", " tigers", "Xena", "Saved", "0.1"),
        row("03:30", "Bears", "Bruno", "Goal", "0.2"),
    ];
    let result = store.import_shots(&key("Lions vs Tigers"), &rows).unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(result.rejected[0].row, 3);
    assert!(result.rejected[0].reason.contains("Bears"));

    let shots = store.resolved_shots(GameFilter::All).unwrap();
    assert_eq!(shots[1].shooting_team, "Tigers");
    assert_eq!(shots[1].shooting_side(), Side::Away);

    // One attempt for and one against while Alice is on the field.
    let alice = player_metrics("Alice", &shots);
    assert_eq!(alice.corsi, 0.0);
}

#[test]
fn empty_batch_leaves_no_game_behind() {
    let mut store = Store::open_in_memory().unwrap();
    let result = store.import_shots(&key("Empty"), &[]).unwrap();
    assert_eq!(result.outcome, ImportOutcome::NothingToImport);
    assert!(result.game_rolled_back);
    assert!(store.games().unwrap().is_empty());
}

// -------------------------------------------------------------------------
// Corrections
// -------------------------------------------------------------------------

#[test]
fn correction_takes_precedence_and_delete_reverts() {
    let (mut store, _) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[1].id;

    store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                result: Some(ShotResult::Goal),
                ..Default::default()
            },
        )
        .unwrap();
    let resolved = store.resolved_shots(GameFilter::All).unwrap();
    assert_eq!(resolved[1].result, ShotResult::Goal);
    assert!(resolved[1].corrected);

    // base event is untouched
    assert_eq!(store.shot(shot_id).unwrap().unwrap().result, ShotResult::Saved);

    assert!(store.delete_correction(shot_id).unwrap());
    let resolved = store.resolved_shots(GameFilter::All).unwrap();
    assert_eq!(resolved[1].result, ShotResult::Saved);
    assert!(!resolved[1].corrected);
}

#[test]
fn partial_update_keeps_earlier_overrides() {
    let (mut store, _) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[0].id;

    store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                shooter: Some("Bea".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let c = store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                xg: Some(0.5),
                is_turnover: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(c.shooter.as_deref(), Some("Bea"));
    assert_eq!(c.xg, Some(0.5));

    let resolved = &store.resolved_shots(GameFilter::All).unwrap()[0];
    assert_eq!(resolved.shooter, "Bea");
    assert_eq!(resolved.shot_type, "Turnover | Direct");
}

#[test]
fn hidden_shots_leave_analysis_but_stay_stored() {
    let (mut store, game_id) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[2].id;
    store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                result: Some(ShotResult::Blocked),
                ..Default::default()
            },
        )
        .unwrap();

    store.hide_shot(shot_id).unwrap();
    assert_eq!(store.resolved_shots(GameFilter::Game(game_id)).unwrap().len(), 2);
    assert_eq!(store.raw_shot_count(GameFilter::Game(game_id)).unwrap(), 3);
    assert_eq!(store.games().unwrap()[0].hidden_count, 1);

    // hiding does not touch overrides, and unhiding brings them back
    store.unhide_shot(shot_id).unwrap();
    let resolved = store.resolved_shots(GameFilter::All).unwrap();
    assert_eq!(resolved.len(), 3);
    assert_eq!(resolved[2].result, ShotResult::Blocked);
}

#[test]
fn non_finite_override_is_rejected_and_nothing_stored() {
    let (mut store, _) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[0].id;

    let err = store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                xg: Some(f64::NAN),
                shooter: Some("Bea".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCorrection(_)));
    assert_eq!(store.correction(shot_id).unwrap(), None);

    let err = store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                distance: Some(f64::INFINITY),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCorrection(_)));
    assert_eq!(store.resolved_shots(GameFilter::All).unwrap()[0].xg, 0.3);
}

#[test]
fn visibility_changes_are_reported() {
    let (mut store, _) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[0].id;

    assert!(!store.unhide_shot(shot_id).unwrap());
    assert_eq!(store.correction(shot_id).unwrap(), None);

    assert!(store.hide_shot(shot_id).unwrap());
    assert!(!store.hide_shot(shot_id).unwrap());
    assert!(store.unhide_shot(shot_id).unwrap());
}

#[test]
fn correcting_a_missing_shot_fails() {
    let (mut store, _) = store_with_batch();
    let err = store
        .save_correction(999, &CorrectionPatch::default())
        .unwrap_err();
    assert!(matches!(err, LedgerError::ShotNotFound(999)));
    assert!(matches!(store.hide_shot(999), Err(LedgerError::ShotNotFound(999))));
}

// -------------------------------------------------------------------------
// Games
// -------------------------------------------------------------------------

#[test]
fn alias_changes_display_name_only() {
    let (mut store, game_id) = store_with_batch();
    store.set_alias(game_id, "Derby").unwrap();
    let games = store.games().unwrap();
    assert_eq!(games[0].display_name, "Derby");
    assert_eq!(games[0].game.name, "Lions vs Tigers");
    assert_eq!(games[0].shot_count, 3);

    assert!(store.clear_alias(game_id).unwrap());
    assert_eq!(store.games().unwrap()[0].display_name, "Lions vs Tigers");
    assert!(matches!(store.set_alias(42, "x"), Err(LedgerError::GameNotFound(42))));
}

#[test]
fn deleting_a_game_cascades() {
    let (mut store, game_id) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[0].id;
    store.hide_shot(shot_id).unwrap();
    store.set_alias(game_id, "Derby").unwrap();

    store.delete_game(game_id).unwrap();
    assert_eq!(store.raw_shot_count(GameFilter::All).unwrap(), 0);
    assert!(store.corrections().unwrap().is_empty());
    assert_eq!(store.alias(game_id).unwrap(), None);

    // the same file can now be imported again
    let again = store.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    assert_eq!(again.inserted, 3);
}

#[test]
fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    {
        let mut store = Store::open(&path).unwrap();
        store.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    }
    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.raw_shot_count(GameFilter::All).unwrap(), 3);
    let again = store.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    assert_eq!(again.outcome, ImportOutcome::AllDuplicates);
}

#[test]
fn unopenable_path_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ledger.db");
    assert!(matches!(Store::open(&path), Err(LedgerError::StorageUnavailable(_))));
}

// -------------------------------------------------------------------------
// Snapshots + persistence
// -------------------------------------------------------------------------

#[test]
fn snapshot_restores_into_fresh_store() {
    let (mut store, game_id) = store_with_batch();
    let shot_id = store.shots(GameFilter::All).unwrap()[0].id;
    store
        .save_correction(
            shot_id,
            &CorrectionPatch {
                xg: Some(0.9),
                ..Default::default()
            },
        )
        .unwrap();
    store.set_alias(game_id, "Derby").unwrap();

    let bytes = store.snapshot().unwrap().to_bytes().unwrap();
    let snapshot = LedgerSnapshot::from_bytes(&bytes).unwrap();

    let mut restored = Store::open_in_memory().unwrap();
    restored.restore(&snapshot).unwrap();
    assert_eq!(
        restored.resolved_shots(GameFilter::All).unwrap(),
        store.resolved_shots(GameFilter::All).unwrap()
    );
    assert_eq!(restored.games().unwrap(), store.games().unwrap());
}

#[derive(Clone, Default)]
struct FlakySink {
    fail: Rc<RefCell<bool>>,
    uploads: Rc<RefCell<usize>>,
}

impl BlobSink for FlakySink {
    fn upload(&mut self, _blob: &[u8]) -> Result<(), SinkError> {
        if *self.fail.borrow() {
            return Err(SinkError::Unavailable("offline".into()));
        }
        *self.uploads.borrow_mut() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "flaky".into()
    }
}

#[test]
fn failed_upload_keeps_data_and_retries_next_change() {
    let sink = FlakySink::default();
    *sink.fail.borrow_mut() = true;
    let mut ws = Workspace::with_sink(Store::open_in_memory().unwrap(), Box::new(sink.clone()));

    let result = ws.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    assert_eq!(result.inserted, 3);
    assert!(ws.upload_pending());
    assert_eq!(ws.resolved_shots(GameFilter::All).unwrap().len(), 3);
    assert!(matches!(ws.persist(), Err(LedgerError::PersistenceUploadFailed(_))));

    *sink.fail.borrow_mut() = false;
    let game_id = result.game_id.unwrap();
    ws.set_alias(game_id, "Derby").unwrap();
    assert!(!ws.upload_pending());
    assert_eq!(*sink.uploads.borrow(), 1);
}

#[test]
fn file_sink_writes_a_readable_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let mut ws = Workspace::with_sink(Store::open_in_memory().unwrap(), Box::new(FileSink::new(&path)));
    ws.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let snapshot = LedgerSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snapshot.shots.len(), 3);
    assert_eq!(snapshot.games.len(), 1);
}

#[test]
fn unhiding_a_visible_shot_uploads_nothing() {
    let sink = FlakySink::default();
    let mut ws = Workspace::with_sink(Store::open_in_memory().unwrap(), Box::new(sink.clone()));
    ws.import_shots(&key("Lions vs Tigers"), &batch()).unwrap();
    assert_eq!(*sink.uploads.borrow(), 1);

    let shot_id = ws.store().shots(GameFilter::All).unwrap()[0].id;
    assert!(!ws.unhide_shot(shot_id).unwrap());
    assert_eq!(*sink.uploads.borrow(), 1);

    assert!(ws.hide_shot(shot_id).unwrap());
    assert_eq!(*sink.uploads.borrow(), 2);
}

#[test]
fn file_sink_reports_io_errors_with_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ledger.json");
    let err = FileSink::new(&path).upload(b"{}").unwrap_err();
    assert!(matches!(err, SinkError::Io { .. }));
    assert!(err.to_string().contains("missing"));
}
