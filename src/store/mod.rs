//! Note persistence
//!
//! [`NoteStore`] is the store interface; [`Store`] implements it on top of a
//! single JSON file.
//!
//! # Example
//!
//! ```rust,no_run
//! use hypernotes::note::Note;
//! use hypernotes::store::{NoteStore, Store};
//!
//! # fn main() -> hypernotes::Result<()> {
//! let store = Store::open("experiments.json")?;
//!
//! let mut note = Note::new("logistic regression baseline");
//! note.metrics_mut().insert("auc".into(), 0.81.into());
//! store.add(&mut note)?;
//!
//! // Later: load, change, write back by identifier
//! let mut latest = store.load()?.remove(0);
//! latest.info_mut().insert("reviewed".into(), true.into());
//! store.update(&[latest])?;
//! # Ok(())
//! # }
//! ```

mod json;
mod ordering;

pub use json::Store;
pub use ordering::{recency_cmp, sort_by_recency};

use crate::note::Note;
use crate::table::Table;
use crate::Result;

/// Store interface for notes.
///
/// Identity is always the note identifier: callers load, modify, and pass
/// back notes carrying their original identifier. Batch operations are
/// all-or-nothing.
pub trait NoteStore {
    /// All stored notes, most recent first (see [`recency_cmp`]).
    ///
    /// # Errors
    ///
    /// Returns error if the backing data cannot be read or decoded.
    fn load(&self) -> Result<Vec<Note>>;

    /// Store a new note, closing it first if it is still open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateIdentifier`](crate::Error::DuplicateIdentifier)
    /// if the identifier is already stored; nothing is written.
    fn add(&self, note: &mut Note) -> Result<()>;

    /// Replace stored notes that share an identifier with `notes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`](crate::Error::UnknownIdentifier)
    /// if any identifier is not stored; nothing is written.
    fn update(&self, notes: &[Note]) -> Result<()>;

    /// Delete stored notes that share an identifier with `notes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIdentifier`](crate::Error::UnknownIdentifier)
    /// if any identifier is not stored; nothing is written.
    fn remove(&self, notes: &[Note]) -> Result<()>;

    /// All stored notes flattened into a [`Table`], most recent first.
    ///
    /// # Errors
    ///
    /// Returns error if loading fails.
    fn load_table(&self) -> Result<Table> {
        Table::from_notes(&self.load()?)
    }
}
