//! Note - one experiment record

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::provenance::{git_from_value, GitInfo, Provenance};
use super::{finite, timestamp, Features};
use crate::{Error, Result};

/// Keys of the well-known note fields, in the order a fresh note writes them.
const FIELD_KEYS: [&str; 12] = [
    "identifier",
    "text",
    "model",
    "parameters",
    "features",
    "target",
    "metrics",
    "info",
    "start_datetime",
    "end_datetime",
    "python_path",
    "git",
];

/// Typed view of the well-known fields.
#[derive(Debug, Clone, PartialEq)]
struct Fields {
    identifier: String,
    text: String,
    model: Option<String>,
    parameters: Map<String, Value>,
    features: Features,
    target: Option<String>,
    metrics: Map<String, Value>,
    info: Map<String, Value>,
    start_datetime: NaiveDateTime,
    end_datetime: Option<NaiveDateTime>,
    python_path: String,
    git: Option<GitInfo>,
}

impl Fields {
    /// Read whatever the content holds; missing or unreadable fields fall back
    /// to empty values.
    fn read(content: &Map<String, Value>) -> Self {
        Self {
            identifier: decode(content, "identifier").unwrap_or_default(),
            text: decode(content, "text").unwrap_or_default(),
            model: decode::<Option<String>>(content, "model").flatten(),
            parameters: decode(content, "parameters").unwrap_or_default(),
            features: decode(content, "features").unwrap_or_default(),
            target: decode::<Option<String>>(content, "target").flatten(),
            metrics: decode(content, "metrics").unwrap_or_default(),
            info: decode(content, "info").unwrap_or_default(),
            start_datetime: decode_timestamp(content, "start_datetime").unwrap_or_default(),
            end_datetime: decode_timestamp(content, "end_datetime"),
            python_path: decode(content, "python_path").unwrap_or_default(),
            git: content.get("git").and_then(git_from_value),
        }
    }

    /// Encoded value per key of [`FIELD_KEYS`]; `None` means the key is omitted.
    fn encode(&self) -> serde_json::Result<[Option<Value>; 12]> {
        let end = self.end_datetime.as_ref().map(timestamp::format);
        let git = self.git.as_ref().map(serde_json::to_value).transpose()?;

        Ok([
            Some(string(&self.identifier)),
            Some(string(&self.text)),
            Some(optional(self.model.as_deref())),
            Some(Value::Object(self.parameters.clone())),
            Some(serde_json::to_value(&self.features)?),
            Some(optional(self.target.as_deref())),
            Some(Value::Object(self.metrics.clone())),
            Some(Value::Object(self.info.clone())),
            Some(string(&timestamp::format(&self.start_datetime))),
            Some(optional(end.as_deref())),
            Some(string(&self.python_path)),
            git,
        ])
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn optional(s: Option<&str>) -> Value {
    s.map_or(Value::Null, string)
}

fn decode<T: DeserializeOwned>(content: &Map<String, Value>, key: &str) -> Option<T> {
    let value = content.get(key)?;
    serde_json::from_value(value.clone())
        .map_err(|e| debug!(key, error = %e, "field kept as stored"))
        .ok()
}

fn decode_timestamp(content: &Map<String, Value>, key: &str) -> Option<NaiveDateTime> {
    let text = decode::<Option<String>>(content, key).flatten()?;
    timestamp::parse(&text)
        .map_err(|e| debug!(key, error = %e, "field kept as stored"))
        .ok()
}

/// Content a note was loaded from, with the typed view read from it.
#[derive(Debug, PartialEq)]
struct Origin {
    content: Map<String, Value>,
    fields: Fields,
}

/// Note records one machine-learning experiment.
///
/// A fresh note (from [`Note::new`] or [`Note::builder`]) gets a UUID v4
/// identifier, a start timestamp and the environment provenance, and stays
/// open until [`Note::end`] is called.
///
/// A note rebuilt from stored content with [`Note::from_content`] is taken
/// as-is. Any JSON object is accepted. Fields that are missing or do not have
/// the expected shape read as empty values, and writing the note back leaves
/// every field that was not changed exactly as it was stored, including
/// missing keys, unknown keys and key order.
///
/// Values that JSON cannot represent (NaN, infinities, maps with non-string
/// keys) are accepted by the `insert_*` methods but make every later write of
/// the note fail with [`Error::Serialization`].
#[derive(Debug, Clone)]
pub struct Note {
    fields: Fields,
    extra: Map<String, Value>,
    unrepresentable: BTreeMap<String, String>,
    origin: Option<Arc<Origin>>,
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.extra == other.extra
            && self.unrepresentable == other.unrepresentable
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.content()
            .map_err(<S::Error as ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

impl Note {
    /// Create a new open note with the given description.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        NoteBuilder::new().text(text).build()
    }

    /// Create a builder for a note with optional fields preset.
    #[must_use]
    pub fn builder() -> NoteBuilder {
        NoteBuilder::new()
    }

    /// Rebuild a note from stored content without filling anything in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContent`] if `content` is not a JSON object.
    pub fn from_content(content: Value) -> Result<Self> {
        match content {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(Error::InvalidContent(format!(
                "expected a JSON object, found {}",
                kind(&other)
            ))),
        }
    }

    fn from_map(content: Map<String, Value>) -> Self {
        let fields = Fields::read(&content);
        let extra = content
            .iter()
            .filter(|(key, _)| !FIELD_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            fields: fields.clone(),
            extra,
            unrepresentable: BTreeMap::new(),
            origin: Some(Arc::new(Origin { content, fields })),
        }
    }

    /// Convert the note to its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the note holds a value JSON cannot
    /// represent.
    pub fn to_content(&self) -> Result<Value> {
        Ok(Value::Object(self.content()?))
    }

    fn content(&self) -> serde_json::Result<Map<String, Value>> {
        if !self.unrepresentable.is_empty() {
            let detail: Vec<String> = self
                .unrepresentable
                .iter()
                .map(|(key, reason)| format!("{key} ({reason})"))
                .collect();
            return Err(ser::Error::custom(format!(
                "cannot represent {} as JSON",
                detail.join(", ")
            )));
        }

        let current = self.fields.encode()?;
        let Some(origin) = &self.origin else {
            return Ok(FIELD_KEYS
                .iter()
                .zip(current)
                .filter_map(|(key, value)| Some(((*key).to_string(), value?)))
                .collect());
        };

        // Stored content wins for every field that has not changed since load
        let mut content = origin.content.clone();
        let loaded = origin.fields.encode()?;
        for ((key, now), then) in FIELD_KEYS.iter().zip(current).zip(loaded) {
            if now == then {
                continue;
            }
            match now {
                Some(value) => {
                    content.insert((*key).to_string(), value);
                }
                None => {
                    content.shift_remove(*key);
                }
            }
        }
        Ok(content)
    }

    /// Start a new note from an existing one.
    ///
    /// Everything is deep-copied except the identifier and start timestamp,
    /// which are fresh. The copy is open again (`end_datetime` cleared), so
    /// it can serve as the base of a parameter sweep.
    #[must_use]
    pub fn derive_from(source: &Self) -> Self {
        let mut note = source.clone();
        note.fields.identifier = new_identifier();
        note.fields.start_datetime = timestamp::now();
        note.fields.end_datetime = None;
        note
    }

    /// Close the note, stamping `end_datetime` with the current time.
    ///
    /// Calling it again moves `end_datetime` forward.
    pub fn end(&mut self) {
        self.fields.end_datetime = Some(timestamp::now().max(self.fields.start_datetime));
    }

    /// `true` until [`Note::end`] has been called.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.fields.end_datetime.is_none()
    }

    /// Get the unique identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.fields.identifier
    }

    /// Get the free-form description.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.fields.text
    }

    /// Set the free-form description.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.fields.text = text.into();
    }

    /// Get the model name, if set.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.fields.model.as_deref()
    }

    /// Set or clear the model name.
    pub fn set_model(&mut self, model: Option<String>) {
        self.fields.model = model;
    }

    /// Get the target variable, if set.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.fields.target.as_deref()
    }

    /// Set or clear the target variable.
    pub fn set_target(&mut self, target: Option<String>) {
        self.fields.target = target;
    }

    /// Get the parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Map<String, Value> {
        &self.fields.parameters
    }

    /// Mutable parameters.
    ///
    /// `Value::from(f64::NAN)` is `null`; use [`Note::insert_parameter`] to
    /// have such values reported instead.
    pub fn parameters_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields.parameters
    }

    /// Replace all parameters.
    pub fn set_parameters(&mut self, parameters: Map<String, Value>) {
        self.fields.parameters = parameters;
        self.forget_unrepresentable("parameters");
    }

    /// Insert one parameter from any serializable value.
    ///
    /// A value JSON cannot represent is not inserted; it is recorded (see
    /// [`Note::unrepresentable`]) and fails the next write.
    pub fn insert_parameter<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        let path = format!("parameters.{key}");
        match encode_value(&value) {
            Ok(value) => {
                self.unrepresentable.remove(&path);
                self.fields.parameters.insert(key, value);
            }
            Err(reason) => {
                self.fields.parameters.shift_remove(&key);
                self.unrepresentable.insert(path, reason);
            }
        }
    }

    /// Get the feature lists.
    #[must_use]
    pub const fn features(&self) -> &Features {
        &self.fields.features
    }

    /// Mutable feature lists.
    pub fn features_mut(&mut self) -> &mut Features {
        &mut self.fields.features
    }

    /// Replace the feature lists.
    pub fn set_features(&mut self, features: Features) {
        self.fields.features = features;
    }

    /// Get the metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Map<String, Value> {
        &self.fields.metrics
    }

    /// Mutable metrics.
    ///
    /// `Value::from(f64::NAN)` is `null`; use [`Note::insert_metric`] to have
    /// such values reported instead.
    pub fn metrics_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields.metrics
    }

    /// Replace all metrics.
    pub fn set_metrics(&mut self, metrics: Map<String, Value>) {
        self.fields.metrics = metrics;
        self.forget_unrepresentable("metrics");
    }

    /// Insert one metric from any serializable value.
    ///
    /// A NaN loss or an infinite score is not inserted; it is recorded (see
    /// [`Note::unrepresentable`]) and fails the next write.
    pub fn insert_metric<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        let path = format!("metrics.{key}");
        match encode_value(&value) {
            Ok(value) => {
                self.unrepresentable.remove(&path);
                self.fields.metrics.insert(key, value);
            }
            Err(reason) => {
                self.fields.metrics.shift_remove(&key);
                self.unrepresentable.insert(path, reason);
            }
        }
    }

    /// Get the free-form info mapping.
    #[must_use]
    pub const fn info(&self) -> &Map<String, Value> {
        &self.fields.info
    }

    /// Mutable info mapping.
    ///
    /// `Value::from(f64::NAN)` is `null`; use [`Note::insert_info`] to have
    /// such values reported instead.
    pub fn info_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields.info
    }

    /// Replace the info mapping.
    pub fn set_info(&mut self, info: Map<String, Value>) {
        self.fields.info = info;
        self.forget_unrepresentable("info");
    }

    /// Insert one info entry from any serializable value.
    ///
    /// A value JSON cannot represent is not inserted; it is recorded (see
    /// [`Note::unrepresentable`]) and fails the next write.
    pub fn insert_info<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        let path = format!("info.{key}");
        match encode_value(&value) {
            Ok(value) => {
                self.unrepresentable.remove(&path);
                self.fields.info.insert(key, value);
            }
            Err(reason) => {
                self.fields.info.shift_remove(&key);
                self.unrepresentable.insert(path, reason);
            }
        }
    }

    /// Values that were inserted but cannot be written, as
    /// `(section.key, reason)`. Empty for a writable note.
    pub fn unrepresentable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.unrepresentable
            .iter()
            .map(|(path, reason)| (path.as_str(), reason.as_str()))
    }

    fn forget_unrepresentable(&mut self, section: &str) {
        self.unrepresentable
            .retain(|path, _| path.split_once('.').map_or(true, |(s, _)| s != section));
    }

    /// Get the start timestamp.
    ///
    /// Stored content without a readable `start_datetime` reports the Unix
    /// epoch.
    #[must_use]
    pub const fn start_datetime(&self) -> NaiveDateTime {
        self.fields.start_datetime
    }

    /// Get the end timestamp, if the note has been closed.
    #[must_use]
    pub const fn end_datetime(&self) -> Option<NaiveDateTime> {
        self.fields.end_datetime
    }

    /// Path of the executable that created the note.
    #[must_use]
    pub fn python_path(&self) -> &str {
        &self.fields.python_path
    }

    /// Git state captured at creation, if any.
    #[must_use]
    pub const fn git(&self) -> Option<&GitInfo> {
        self.fields.git.as_ref()
    }

    /// Keys from stored content that are not note fields.
    #[must_use]
    pub const fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// JSON form of `value`, or why there is none.
fn encode_value<T: Serialize>(value: &T) -> std::result::Result<Value, String> {
    finite::check(value)
        .and_then(|()| serde_json::to_value(value))
        .map_err(|e| e.to_string())
}

fn new_identifier() -> String {
    Uuid::new_v4().to_string()
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Builder for `Note`.
#[derive(Debug, Default)]
pub struct NoteBuilder {
    text: String,
    model: Option<String>,
    target: Option<String>,
    parameters: Map<String, Value>,
    feature_categories: Vec<String>,
    provenance: Option<Provenance>,
    start_datetime: Option<NaiveDateTime>,
}

impl NoteBuilder {
    /// Create a new builder with empty defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the target variable.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Preset the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Add a feature category beyond the four defaults.
    #[must_use]
    pub fn feature_category(mut self, name: impl Into<String>) -> Self {
        self.feature_categories.push(name.into());
        self
    }

    /// Use the given provenance instead of probing the environment.
    #[must_use]
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Set a custom start timestamp (truncated to whole seconds).
    #[must_use]
    pub fn start_datetime(mut self, start_datetime: NaiveDateTime) -> Self {
        self.start_datetime = Some(timestamp::truncate(start_datetime));
        self
    }

    /// Build the open `Note`.
    #[must_use]
    pub fn build(self) -> Note {
        let mut features = Features::new();
        for category in self.feature_categories {
            features.add_category(category);
        }
        let provenance = self.provenance.unwrap_or_else(Provenance::detect);

        Note {
            fields: Fields {
                identifier: new_identifier(),
                text: self.text,
                model: self.model,
                parameters: self.parameters,
                features,
                target: self.target,
                metrics: Map::new(),
                info: Map::new(),
                start_datetime: self.start_datetime.unwrap_or_else(timestamp::now),
                end_datetime: None,
                python_path: provenance.python_path,
                git: provenance.git,
            },
            extra: Map::new(),
            unrepresentable: BTreeMap::new(),
            origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiet() -> NoteBuilder {
        Note::builder().provenance(Provenance::default())
    }

    fn loaded(content: Value) -> Note {
        Note::from_content(content).unwrap()
    }

    #[test]
    fn test_note_new_is_open() {
        let note = quiet().text("baseline").build();
        assert_eq!(note.text(), "baseline");
        assert!(note.is_open());
        assert!(note.model().is_none());
        assert!(note.features().numerical().is_empty());
    }

    #[test]
    fn test_note_end_after_start() {
        let mut note = quiet().build();
        note.end();
        assert!(!note.is_open());
        assert!(note.end_datetime().unwrap() >= note.start_datetime());
    }

    #[test]
    fn test_fresh_note_writes_every_field_in_order() {
        let content = quiet().build().to_content().unwrap();
        let keys: Vec<&String> = content.as_object().unwrap().keys().collect();
        assert_eq!(keys, FIELD_KEYS[..11].to_vec());
    }

    #[test]
    fn test_from_content_rejects_array() {
        let err = Note::from_content(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidContent(ref m) if m.contains("an array")));
    }

    #[test]
    fn test_bad_timestamp_is_kept_as_stored() {
        let content = json!({
            "identifier": "a",
            "start_datetime": "2019-01-01 10:00:00"
        });
        let note = loaded(content.clone());

        assert_eq!(note.start_datetime(), NaiveDateTime::default());
        assert_eq!(note.to_content().unwrap(), content);
    }

    #[test]
    fn test_malformed_field_reads_empty_and_is_kept() {
        let content = json!({
            "identifier": "a",
            "start_datetime": "2019-01-01T10-00-00",
            "model": {"name": "xgb"},
            "metrics": [0.1, 0.2]
        });
        let note = loaded(content.clone());

        assert!(note.model().is_none());
        assert!(note.metrics().is_empty());
        assert!(note.extra().is_empty());
        assert_eq!(note.to_content().unwrap(), content);
    }

    #[test]
    fn test_changed_field_replaces_stored_value() {
        let mut note = loaded(json!({
            "identifier": "a",
            "model": {"name": "xgb"},
            "start_datetime": "2019-01-01T10-00-00"
        }));
        note.set_model(Some("xgboost".into()));
        note.insert_metric("auc", 0.7);

        let content = note.to_content().unwrap();
        let keys: Vec<&String> = content.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["identifier", "model", "start_datetime", "metrics"]);
        assert_eq!(content["model"], "xgboost");
    }

    #[test]
    fn test_empty_git_mapping_is_absent_and_kept() {
        let content = json!({
            "identifier": "a",
            "start_datetime": "2019-01-01T10-00-00",
            "git": {}
        });
        let note = loaded(content.clone());

        assert!(note.git().is_none());
        assert!(note.extra().is_empty());
        assert_eq!(note.to_content().unwrap(), content);
    }

    #[test]
    fn test_nan_metric_fails_write() {
        let mut note = quiet().build();
        note.insert_metric("loss", f64::NAN);

        assert!(!note.metrics().contains_key("loss"));
        assert_eq!(note.unrepresentable().count(), 1);
        let err = note.to_content().unwrap_err();
        assert!(matches!(
            err,
            Error::Serialization(ref e) if e.to_string().contains("metrics.loss")
        ));
        assert!(serde_json::to_string(&note).is_err());
    }

    #[test]
    fn test_overwriting_unrepresentable_value_clears_it() {
        let mut note = quiet().build();
        note.insert_metric("loss", f64::INFINITY);
        note.insert_metric("loss", 0.25);

        assert_eq!(note.unrepresentable().count(), 0);
        assert_eq!(note.to_content().unwrap()["metrics"]["loss"], 0.25);
    }

    #[test]
    fn test_set_section_clears_its_unrepresentable_values() {
        let mut note = quiet().build();
        note.insert_info("curve", vec![0.5, f64::NAN]);
        note.insert_parameter("alpha", f64::NAN);
        note.set_info(Map::new());

        let pending: Vec<(&str, &str)> = note.unrepresentable().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "parameters.alpha");
    }

    #[test]
    fn test_insert_info_with_non_string_keys_fails_write() {
        let mut note = quiet().build();
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), 0.5);

        note.insert_info("pairs", bad);
        assert!(note.info().is_empty());
        assert!(matches!(note.to_content(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_builder_feature_category() {
        let note = quiet().feature_category("text").build();
        assert_eq!(note.features().category("text"), Some(&[][..]));
    }
}
