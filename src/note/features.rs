//! Feature lists - which input columns a model used, grouped by kind

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Names of the four categories every note starts with.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["identifier", "binary", "categorical", "numerical"];

/// Column names grouped into feature categories.
///
/// The four default categories are always present. Additional categories
/// (added through [`NoteBuilder::feature_category`](super::NoteBuilder::feature_category)
/// or [`Features::add_category`]) are serialized after them in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    identifier: Vec<String>,
    #[serde(default)]
    binary: Vec<String>,
    #[serde(default)]
    categorical: Vec<String>,
    #[serde(default)]
    numerical: Vec<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Vec<String>>,
}

impl Features {
    /// Create the default structure: four empty categories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier columns (row keys, never model inputs).
    #[must_use]
    pub fn identifier(&self) -> &[String] {
        &self.identifier
    }

    /// Mutable identifier columns.
    pub fn identifier_mut(&mut self) -> &mut Vec<String> {
        &mut self.identifier
    }

    /// Binary columns.
    #[must_use]
    pub fn binary(&self) -> &[String] {
        &self.binary
    }

    /// Mutable binary columns.
    pub fn binary_mut(&mut self) -> &mut Vec<String> {
        &mut self.binary
    }

    /// Categorical columns.
    #[must_use]
    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Mutable categorical columns.
    pub fn categorical_mut(&mut self) -> &mut Vec<String> {
        &mut self.categorical
    }

    /// Numerical columns.
    #[must_use]
    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    /// Mutable numerical columns.
    pub fn numerical_mut(&mut self) -> &mut Vec<String> {
        &mut self.numerical
    }

    /// Add an empty category. Existing categories are left untouched.
    pub fn add_category(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !DEFAULT_CATEGORIES.contains(&name.as_str()) {
            self.extra.entry(name).or_default();
        }
    }

    /// Look up any category, default or added, by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&[String]> {
        match name {
            "identifier" => Some(&self.identifier),
            "binary" => Some(&self.binary),
            "categorical" => Some(&self.categorical),
            "numerical" => Some(&self.numerical),
            other => self.extra.get(other).map(Vec::as_slice),
        }
    }

    /// Mutable lookup of any category by name.
    pub fn category_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "identifier" => Some(&mut self.identifier),
            "binary" => Some(&mut self.binary),
            "categorical" => Some(&mut self.categorical),
            "numerical" => Some(&mut self.numerical),
            other => self.extra.get_mut(other),
        }
    }

    /// All categories in serialization order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        [
            ("identifier", self.identifier.as_slice()),
            ("binary", self.binary.as_slice()),
            ("categorical", self.categorical.as_slice()),
            ("numerical", self.numerical.as_slice()),
        ]
        .into_iter()
        .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
    }
}
