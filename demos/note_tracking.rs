//! Note Tracking Example
//!
//! Records a small hyperparameter sweep in a JSON store, updates it with
//! results, and exports the flattened store to Parquet.
//!
//! Run with: cargo run --example note_tracking

use hypernotes::note::Note;
use hypernotes::store::{NoteStore, Store};
use serde_json::json;

fn main() -> hypernotes::Result<()> {
    println!("=== hypernotes Note Tracking ===\n");

    let dir = tempfile::tempdir()?;
    let store = Store::open(dir.path().join("hypernotes.json"))?;
    println!("Store: {}\n", store.path().display());

    // -------------------------------------------------------------------------
    // 1. Describe a base configuration
    // -------------------------------------------------------------------------
    println!("1. Creating base note...");

    let mut base = Note::builder()
        .text("Random forest on churn data")
        .model("RandomForestClassifier")
        .target("churned")
        .build();
    base.insert_parameter("n_estimators", 200);
    base.insert_parameter("criterion", "gini");
    base.features_mut().identifier_mut().push("customer_id".into());
    base.features_mut().binary_mut().push("has_contract".into());
    base.features_mut().categorical_mut().push("country".into());
    base.features_mut().numerical_mut().extend(["tenure".to_string(), "monthly_fee".to_string()]);

    println!("   Identifier: {}", base.identifier());
    println!("   Started: {}", base.start_datetime());
    if let Some(git) = base.git() {
        println!("   Git: {} @ {} ({})", git.repo_name, git.branch, git.commit);
    }

    // -------------------------------------------------------------------------
    // 2. Sweep max_depth, one derived note per value
    // -------------------------------------------------------------------------
    println!("\n2. Sweeping max_depth...");

    for depth in [4_i32, 8, 16] {
        let mut note = Note::derive_from(&base);
        note.insert_parameter("max_depth", depth);

        // Pretend deeper trees fit slightly better
        note.insert_metric("accuracy", 0.80 + f64::from(depth) / 200.0);
        store.add(&mut note)?;

        println!("   max_depth={depth:<2} -> {}", note.identifier());
    }

    // -------------------------------------------------------------------------
    // 3. Load most recent first, attach a follow-up result
    // -------------------------------------------------------------------------
    println!("\n3. Updating the best run...");

    let notes = store.load()?;
    let mut best = notes
        .iter()
        .max_by(|a, b| {
            let score = |n: &Note| n.metrics().get("accuracy").and_then(|v| v.as_f64());
            score(a).partial_cmp(&score(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
        .ok_or_else(|| hypernotes::Error::InvalidContent("store is empty".into()))?;

    best.insert_metric("holdout_accuracy", 0.83);
    best.insert_info("selected", true);
    store.update(std::slice::from_ref(&best))?;
    println!("   Updated {}", best.identifier());

    // -------------------------------------------------------------------------
    // 4. Drop the weakest run
    // -------------------------------------------------------------------------
    println!("\n4. Removing the shallowest run...");

    let shallow: Vec<Note> = store
        .load()?
        .into_iter()
        .filter(|n| n.parameters().get("max_depth") == Some(&json!(4)))
        .collect();
    store.remove(&shallow)?;
    println!("   Remaining notes: {}", store.load()?.len());

    // -------------------------------------------------------------------------
    // 5. Flatten and export
    // -------------------------------------------------------------------------
    println!("\n5. Flattened table:");

    let table = store.load_table()?;
    for name in table.column_names().take(10) {
        println!("   {name}");
    }
    if table.num_columns() > 10 {
        println!("   ... {} more", table.num_columns() - 10);
    }

    let output = dir.path().join("hypernotes.parquet");
    table.write_parquet(&output)?;
    println!("\n   Exported {} rows to {}", table.num_rows(), output.display());

    println!("\n=== Note Tracking Complete ===");
    Ok(())
}
