//! # hypernotes: lightweight notes on machine-learning experiments
//!
//! A [`Note`](note::Note) records one experiment: parameters, metrics,
//! feature lists, timing, and where it ran. A [`Store`](store::Store) keeps
//! notes in a single JSON file and hands them back most recent first.
//!
//! ## Design
//!
//! - **Whole-file store**: every call reads the full file; every change
//!   rewrites it atomically (temporary file + rename)
//! - **Identity by identifier**: update and remove match on the UUID assigned
//!   at creation, never on position or content
//! - **Stable timestamps**: local time, whole seconds, `YYYY-MM-DDTHH-MM-SS`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hypernotes::note::Note;
//! use hypernotes::store::{NoteStore, Store};
//!
//! let store = Store::open("hypernotes.json")?;
//!
//! let mut note = Note::new("random forest, 500 trees");
//! note.set_model(Some("RandomForestClassifier".into()));
//! note.parameters_mut().insert("n_estimators".into(), 500.into());
//! note.metrics_mut().insert("accuracy".into(), 0.91.into());
//! store.add(&mut note)?;
//!
//! for note in store.load()? {
//!     println!("{} {}", note.identifier(), note.text());
//! }
//! # Ok::<(), hypernotes::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod note;
pub mod store;
pub mod table;
pub mod view;

pub use error::{Error, Result};
pub use note::{Note, NoteBuilder};
pub use store::{NoteStore, Store};
pub use table::Table;
