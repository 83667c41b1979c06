//! Tabular view of notes
//!
//! Notes are nested; analysis tools want flat columns. [`Table::from_notes`]
//! flattens every note (`metrics.accuracy`, `git.branch`, ...) and lines the
//! results up column by column, with null where a note lacks a column.
//!
//! Columns follow a fixed priority (see [`order_columns`]) so the most useful
//! ones come first in any rendering.

mod columnar;

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::note::Note;
use crate::Result;

/// Separator between nested key names.
pub const SEPARATOR: char = '.';

enum Slot {
    Exact(&'static str),
    Prefix(&'static str),
}

const PRIORITY: [Slot; 12] = [
    Slot::Exact("start_datetime"),
    Slot::Exact("end_datetime"),
    Slot::Exact("text"),
    Slot::Exact("model"),
    Slot::Exact("identifier"),
    Slot::Prefix("metrics"),
    Slot::Prefix("parameters"),
    Slot::Prefix("features"),
    Slot::Exact("target"),
    Slot::Prefix("info"),
    Slot::Prefix("git"),
    Slot::Exact("python_path"),
];

impl Slot {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == *exact,
            Self::Prefix(prefix) => name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(SEPARATOR)),
        }
    }
}

fn rank(name: &str) -> usize {
    PRIORITY
        .iter()
        .position(|slot| slot.matches(name))
        .unwrap_or(PRIORITY.len())
}

/// Flatten nested mappings into dot-joined keys.
///
/// Arrays and scalars are leaves; an empty nested mapping contributes no key.
#[must_use]
pub fn flatten(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, None, map);
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{prefix}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(&key), inner),
            leaf => {
                out.insert(key, leaf.clone());
            }
        }
    }
}

/// Order column names for display.
///
/// `start_datetime`, `end_datetime`, `text`, `model`, `identifier`, then
/// `metrics.*`, `parameters.*`, `features.*`, `target`, `info.*`, `git.*`,
/// `python_path`, then everything else. Names within a group are sorted.
/// Duplicates are dropped.
#[must_use]
pub fn order_columns<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = names
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    names.sort_by_cached_key(|name| rank(name));
    names
}

/// One named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Column name (dot-joined key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values, one per row.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Column-oriented table of flattened notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Flatten notes into a table, keeping their order as row order.
    ///
    /// # Errors
    ///
    /// Returns error if a note cannot be converted to JSON.
    pub fn from_notes(notes: &[Note]) -> Result<Self> {
        let rows = notes
            .iter()
            .map(|note| match note.to_content()? {
                Value::Object(map) => Ok(flatten(&map)),
                _ => Ok(Map::new()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_rows(&rows))
    }

    /// Build a table from already-flat rows.
    #[must_use]
    pub fn from_rows(rows: &[Map<String, Value>]) -> Self {
        let names = order_columns(rows.iter().flat_map(|row| row.keys().cloned()));
        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).cloned().unwrap_or(Value::Null))
                    .collect();
                Column { name, values }
            })
            .collect();

        Self {
            columns,
            num_rows: rows.len(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// `true` if the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// All columns in display order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in display order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Values of one column, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(Column::values)
    }

    /// Rows as flat maps, columns in display order.
    pub fn rows(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        (0..self.num_rows).map(move |i| {
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[i].clone()))
                .collect()
        })
    }
}
