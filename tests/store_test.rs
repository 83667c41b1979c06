//! Store Tests
//!
//! add/update/remove/load semantics of the JSON-file store.

use std::fs;

use chrono::NaiveDate;
use hypernotes::note::{Note, Provenance};
use hypernotes::store::{NoteStore, Store};
use hypernotes::Error;
use serde_json::json;
use tempfile::TempDir;

fn temp_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = Store::open(dir.path().join("store.json")).expect("failed to open store");
    (store, dir)
}

fn note(text: &str) -> Note {
    Note::builder()
        .text(text)
        .provenance(Provenance::default())
        .build()
}

/// A closed note whose end timestamp is fixed by its stored content.
fn closed(id: &str, end: &str) -> Note {
    Note::from_content(json!({
        "identifier": id,
        "text": id,
        "start_datetime": "2019-01-01T00-00-00",
        "end_datetime": end,
    }))
    .unwrap()
}

fn ids(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(Note::identifier).collect()
}

// =============================================================================
// open / load
// =============================================================================

#[test]
fn test_new_store_is_empty_array() {
    let (store, _dir) = temp_store();
    assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_reopen_keeps_notes() {
    let (store, _dir) = temp_store();
    store.add(&mut note("persisted")).unwrap();

    let reopened = Store::open(store.path()).unwrap();
    let notes = reopened.load().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text(), "persisted");
}

#[test]
fn test_round_trip_preserves_content_and_key_order() {
    let (store, _dir) = temp_store();
    let mut original = note("round trip");
    original.insert_parameter("n_estimators", 500);
    original.insert_parameter("criterion", "gini");
    original.insert_metric("auc", 0.83);
    original.features_mut().identifier_mut().push("customer_id".into());
    original.insert_info("confusion", vec![vec![50, 3], vec![4, 43]]);
    original.end();

    store.add(&mut original.clone()).unwrap();
    let loaded = store.load().unwrap().remove(0);

    assert_eq!(loaded, original);
    assert_eq!(
        serde_json::to_string(&loaded).unwrap(),
        serde_json::to_string(&original).unwrap()
    );
}

#[test]
fn test_loads_pre_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"[{"identifier": "legacy", "text": "from an older run",
            "start_datetime": "2018-06-01T09-00-00", "end_datetime": "2018-06-01T09-30-00",
            "metrics": {"rmse": 1.5}}]"#,
    )
    .unwrap();

    let store = Store::open(&path).unwrap();
    let notes = store.load().unwrap();
    assert_eq!(notes[0].identifier(), "legacy");
    assert_eq!(notes[0].metrics()["rmse"], 1.5);
}

#[test]
fn test_loads_entry_with_malformed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    fs::write(
        &path,
        r#"[{"identifier": "odd", "model": {"name": "xgb"}, "metrics": [0.1],
            "start_datetime": "2019-01-01T00-00-00", "end_datetime": "2019-01-01T01-00-00"}]"#,
    )
    .unwrap();

    let store = Store::open(&path).unwrap();
    let notes = store.load().unwrap();
    assert_eq!(ids(&notes), ["odd"]);
    assert!(notes[0].model().is_none());
    assert!(notes[0].metrics().is_empty());

    store.add(&mut note("next to it")).unwrap();
    assert_eq!(store.load_table().unwrap().num_rows(), 2);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let odd = raw.as_array().unwrap().iter().find(|e| e["identifier"] == "odd").unwrap();
    assert_eq!(odd["model"], json!({"name": "xgb"}));
    assert_eq!(odd["metrics"], json!([0.1]));
}

#[test]
fn test_untouched_entries_written_back_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let legacy = json!({
        "identifier": "legacy",
        "start_datetime": "2019-01-01T00-00-00",
        "end_datetime": "2019-01-01T01-00-00",
        "model": 42,
        "git": {},
        "dataset": "train_v2"
    });
    let other = json!({
        "identifier": "other",
        "text": "to be updated",
        "start_datetime": "2018-01-01T00-00-00",
        "end_datetime": "2018-01-01T01-00-00"
    });
    fs::write(&path, serde_json::to_vec(&json!([legacy, other])).unwrap()).unwrap();
    let store = Store::open(&path).unwrap();

    let mut target = store.load().unwrap().remove(1);
    target.set_text("updated");
    store.update(&[target]).unwrap();
    store.add(&mut note("fresh")).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let entries = raw.as_array().unwrap();
    let find = |id: &str| entries.iter().find(|e| e["identifier"] == id).unwrap();
    assert_eq!(find("legacy"), &legacy);
    assert_eq!(
        serde_json::to_string(find("legacy")).unwrap(),
        serde_json::to_string(&legacy).unwrap()
    );
    assert_eq!(find("other")["text"], "updated");
    assert!(find("other").get("python_path").is_none());
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_load_most_recent_first() {
    let (store, _dir) = temp_store();
    store.add(&mut closed("a", "2019-01-01T10-00-00")).unwrap();
    store.add(&mut closed("c", "2019-01-01T12-00-00")).unwrap();
    store.add(&mut closed("b", "2019-01-01T11-00-00")).unwrap();

    assert_eq!(ids(&store.load().unwrap()), ["c", "b", "a"]);
}

#[test]
fn test_equal_end_ordered_by_identifier_descending() {
    let (store, _dir) = temp_store();
    let end = "2019-01-01T10-00-00";
    for id in ["m", "z", "a"] {
        store.add(&mut closed(id, end)).unwrap();
    }

    for _ in 0..3 {
        assert_eq!(ids(&store.load().unwrap()), ["z", "m", "a"]);
    }
}

#[test]
fn test_file_is_written_sorted() {
    let (store, _dir) = temp_store();
    store.add(&mut closed("old", "2019-01-01T10-00-00")).unwrap();
    store.add(&mut closed("new", "2019-01-02T10-00-00")).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw[0]["identifier"], "new");
    assert_eq!(raw[1]["identifier"], "old");
}

#[test]
fn test_open_note_in_file_sorts_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    fs::write(
        &path,
        r#"[{"identifier": "closed", "start_datetime": "2019-01-01T00-00-00",
             "end_datetime": "2030-01-01T00-00-00"},
            {"identifier": "running", "start_datetime": "2019-01-01T00-00-00",
             "end_datetime": null}]"#,
    )
    .unwrap();

    let store = Store::open(&path).unwrap();
    assert_eq!(ids(&store.load().unwrap()), ["running", "closed"]);
}

// =============================================================================
// add
// =============================================================================

#[test]
fn test_add_closes_open_note() {
    let (store, _dir) = temp_store();
    let mut n = note("closing");
    assert!(n.is_open());

    store.add(&mut n).unwrap();

    assert!(!n.is_open());
    let stored = store.load().unwrap().remove(0);
    assert_eq!(stored.end_datetime(), n.end_datetime());
}

#[test]
fn test_add_keeps_existing_end() {
    let (store, _dir) = temp_store();
    let mut n = closed("fixed", "2019-03-03T03-03-03");
    store.add(&mut n).unwrap();

    let stored = store.load().unwrap().remove(0);
    assert_eq!(
        stored.end_datetime(),
        NaiveDate::from_ymd_opt(2019, 3, 3).unwrap().and_hms_opt(3, 3, 3)
    );
}

#[test]
fn test_add_duplicate_identifier_rejected() {
    let (store, _dir) = temp_store();
    let mut n = note("first");
    store.add(&mut n).unwrap();
    let before = fs::read(store.path()).unwrap();

    let mut again = n.clone();
    again.set_text("second");
    let err = store.add(&mut again).unwrap_err();

    assert!(matches!(err, Error::DuplicateIdentifier(ref id) if id == n.identifier()));
    assert_eq!(store.load().unwrap().len(), 1);
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_add_non_finite_metric_leaves_store_unchanged() {
    let (store, _dir) = temp_store();
    store.add(&mut note("healthy")).unwrap();
    let before = fs::read(store.path()).unwrap();

    let mut diverged = note("diverged");
    diverged.insert_metric("loss", f64::NAN);
    diverged.insert_info("loss_curve", vec![0.5, f64::INFINITY]);
    let err = store.add(&mut diverged).unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
    assert!(diverged.is_open());
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert_eq!(store.load().unwrap().len(), 1);

    diverged.insert_metric("loss", 0.5);
    diverged.insert_info("loss_curve", vec![0.5, 0.4]);
    store.add(&mut diverged).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().any(|n| n.metrics().get("loss") == Some(&json!(0.5))));
}

#[test]
fn test_add_unrepresentable_info_leaves_store_unchanged() {
    let (store, _dir) = temp_store();
    store.add(&mut note("valid")).unwrap();
    let before = fs::read(store.path()).unwrap();

    let mut pairs = std::collections::HashMap::new();
    pairs.insert((0, 1), "edge");
    let mut n = note("tuple keys");
    n.insert_info("pairs", pairs);
    let err = store.add(&mut n).unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert_eq!(ids(&store.load().unwrap()).len(), 1);
}

#[test]
fn test_update_non_finite_value_leaves_store_unchanged() {
    let (store, _dir) = temp_store();
    let mut n = note("scored");
    store.add(&mut n).unwrap();
    let before = fs::read(store.path()).unwrap();

    n.insert_parameter("alpha", f64::NEG_INFINITY);
    let err = store.update(&[n]).unwrap_err();

    assert!(matches!(err, Error::Serialization(_)));
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_add_sees_external_writes() {
    let (store, _dir) = temp_store();
    let other = Store::open(store.path()).unwrap();

    other.add(&mut note("from another handle")).unwrap();
    store.add(&mut note("from this handle")).unwrap();

    assert_eq!(store.load().unwrap().len(), 2);
}

#[test]
fn test_add_stores_copy() {
    let (store, _dir) = temp_store();
    let mut n = note("copy");
    store.add(&mut n).unwrap();

    n.insert_metric("late", 1);
    assert!(store.load().unwrap()[0].metrics().is_empty());
}

// =============================================================================
// update
// =============================================================================

#[test]
fn test_example_scenario() {
    let (store, _dir) = temp_store();

    let mut a = closed("a", "2019-01-01T10-00-00");
    a.insert_parameter("lr", 0.1);
    store.add(&mut a).unwrap();

    let mut b = closed("b", "2019-01-01T10-00-01");
    b.insert_parameter("lr", 0.2);
    store.add(&mut b).unwrap();

    assert_eq!(ids(&store.load().unwrap()), ["b", "a"]);

    let mut a_prime = a.clone();
    a_prime.insert_metric("accuracy", 0.9);
    store.update(&[a_prime]).unwrap();

    let notes = store.load().unwrap();
    assert_eq!(ids(&notes), ["b", "a"]);
    assert_eq!(notes[1].metrics()["accuracy"], 0.9);
    assert_eq!(notes[1].parameters()["lr"], 0.1);
}

#[test]
fn test_update_many() {
    let (store, _dir) = temp_store();
    let mut loaded = Vec::new();
    for i in 0..3 {
        store.add(&mut note(&format!("note {i}"))).unwrap();
    }
    for mut n in store.load().unwrap() {
        n.insert_info("reviewed", true);
        loaded.push(n);
    }

    store.update(&loaded[..2]).unwrap();

    let reviewed = store
        .load()
        .unwrap()
        .iter()
        .filter(|n| n.info().contains_key("reviewed"))
        .count();
    assert_eq!(reviewed, 2);
}

#[test]
fn test_update_unknown_identifier_leaves_file() {
    let (store, _dir) = temp_store();
    let mut stored = note("stored");
    store.add(&mut stored).unwrap();
    let before = fs::read(store.path()).unwrap();

    stored.set_text("changed");
    let stranger = note("never added");
    let err = store.update(&[stored, stranger.clone()]).unwrap_err();

    match err {
        Error::UnknownIdentifier(missing) => {
            assert_eq!(missing, [stranger.identifier().to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

// =============================================================================
// remove
// =============================================================================

#[test]
fn test_remove_leaves_others_intact() {
    let (store, _dir) = temp_store();
    let mut keep = closed("keep", "2019-01-01T10-00-00");
    keep.insert_metric("f1", 0.7);
    let mut drop = closed("drop", "2019-01-01T11-00-00");
    store.add(&mut keep).unwrap();
    store.add(&mut drop).unwrap();

    store.remove(&[drop]).unwrap();

    let notes = store.load().unwrap();
    assert_eq!(ids(&notes), ["keep"]);
    assert_eq!(notes[0], keep);
}

#[test]
fn test_remove_is_all_or_nothing() {
    let (store, _dir) = temp_store();
    let mut stored = note("stored");
    store.add(&mut stored).unwrap();
    let before = fs::read(store.path()).unwrap();

    let err = store.remove(&[stored, note("unknown")]).unwrap_err();

    assert!(matches!(err, Error::UnknownIdentifier(_)));
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn test_remove_then_add_again() {
    let (store, _dir) = temp_store();
    let mut n = note("cycled");
    store.add(&mut n).unwrap();
    store.remove(std::slice::from_ref(&n)).unwrap();
    assert!(store.load().unwrap().is_empty());

    store.add(&mut n).unwrap();
    assert_eq!(store.load().unwrap().len(), 1);
}

// =============================================================================
// load_table
// =============================================================================

#[test]
fn test_load_table_columns() {
    let (store, _dir) = temp_store();
    let mut first = closed("first", "2019-01-01T10-00-00");
    first.insert_metric("recall", 0.2);
    let mut second = closed("second", "2019-01-01T11-00-00");
    second.insert_parameter("impute_missings", true);
    store.add(&mut first).unwrap();
    store.add(&mut second).unwrap();

    let table = store.load_table().unwrap();

    assert_eq!(table.num_rows(), 2);
    assert_eq!(
        table.column("metrics.recall").unwrap(),
        [serde_json::Value::Null, json!(0.2)]
    );
    assert_eq!(
        table.column("parameters.impute_missings").unwrap(),
        [json!(true), serde_json::Value::Null]
    );
    assert_eq!(
        table.column_names().take(5).collect::<Vec<_>>(),
        ["start_datetime", "end_datetime", "text", "identifier", "metrics.recall"]
    );
    assert!(table.column("model").is_none());
}
