//! JSON-file store
//!
//! **Whole-file design**: every operation reads the complete file, and every
//! mutation rewrites it. There is no append path and no lock.
//! - Reload-before-write narrows the window for lost updates between
//!   processes, it does not close it
//! - Writes go to a sibling temporary file which is renamed over the store,
//!   so a failed write never leaves a truncated file behind

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{sort_by_recency, NoteStore};
use crate::note::Note;
use crate::{Error, Result};

/// Note store backed by one JSON file holding an array of notes.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open the store at `path`, creating it as an empty array if missing.
    ///
    /// An existing file is not read until the first operation.
    ///
    /// # Errors
    ///
    /// Returns error if the file or its parent directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };

        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            persist(&store.path, &Vec::<Note>::new())?;
            info!(path = %store.path.display(), "created empty store");
        }

        Ok(store)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Note>> {
        let bytes = fs::read(&self.path)?;
        let content: Value = serde_json::from_slice(&bytes)?;
        let Value::Array(entries) = content else {
            return Err(Error::InvalidContent(format!(
                "{} does not hold a JSON array",
                self.path.display()
            )));
        };

        let mut notes = entries
            .into_iter()
            .map(Note::from_content)
            .collect::<Result<Vec<_>>>()?;
        sort_by_recency(&mut notes);

        debug!(path = %self.path.display(), count = notes.len(), "loaded notes");
        Ok(notes)
    }

    fn write(&self, mut notes: Vec<Note>) -> Result<()> {
        sort_by_recency(&mut notes);
        persist(&self.path, &notes)
    }
}

impl NoteStore for Store {
    fn load(&self) -> Result<Vec<Note>> {
        self.read()
    }

    fn add(&self, note: &mut Note) -> Result<()> {
        let mut notes = self.read()?;
        if notes.iter().any(|n| n.identifier() == note.identifier()) {
            return Err(Error::DuplicateIdentifier(note.identifier().to_string()));
        }

        let mut stored = note.clone();
        if stored.is_open() {
            stored.end();
        }
        notes.push(stored.clone());
        self.write(notes)?;
        *note = stored;

        info!(identifier = note.identifier(), "note added");
        Ok(())
    }

    fn update(&self, notes: &[Note]) -> Result<()> {
        let updates = index_batch(notes)?;
        if updates.is_empty() {
            return Ok(());
        }

        let mut stored = self.read()?;
        ensure_stored(&stored, updates.keys().copied())?;

        for slot in &mut stored {
            if let Some(note) = updates.get(slot.identifier()) {
                *slot = (*note).clone();
            }
        }
        self.write(stored)?;

        info!(count = updates.len(), "notes updated");
        Ok(())
    }

    fn remove(&self, notes: &[Note]) -> Result<()> {
        let removals = index_batch(notes)?;
        if removals.is_empty() {
            return Ok(());
        }

        let mut stored = self.read()?;
        ensure_stored(&stored, removals.keys().copied())?;

        stored.retain(|n| !removals.contains_key(n.identifier()));
        self.write(stored)?;

        info!(count = removals.len(), "notes removed");
        Ok(())
    }
}

/// Index a batch by identifier, rejecting repeats.
fn index_batch(notes: &[Note]) -> Result<HashMap<&str, &Note>> {
    let mut index = HashMap::with_capacity(notes.len());
    for note in notes {
        if index.insert(note.identifier(), note).is_some() {
            return Err(Error::DuplicateIdentifier(note.identifier().to_string()));
        }
    }
    Ok(index)
}

fn ensure_stored<'a>(stored: &[Note], identifiers: impl Iterator<Item = &'a str>) -> Result<()> {
    let known: HashSet<&str> = stored.iter().map(Note::identifier).collect();
    let mut missing: Vec<String> = identifiers
        .filter(|id| !known.contains(id))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort();
        Err(Error::UnknownIdentifier(missing))
    }
}

/// Serialize `value` fully, then replace `path` with it atomically.
fn persist<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let tmp_path = temp_path(path);
    let written = (|| -> Result<()> {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
