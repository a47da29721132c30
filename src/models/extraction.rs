//! Per-note extraction results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key holding the list of needed resources.
pub const NEEDED_KEY: &str = "resources_needed";

/// Key holding the list of available resources.
pub const AVAILABLE_KEY: &str = "resources_available";

/// Sentiments, needs and availabilities extracted from one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteExtraction {
    /// Note identifier (the note's index in its batch).
    #[serde(default)]
    pub id: u64,
    /// The note text the extraction was produced from.
    #[serde(default)]
    pub original_note: String,
    /// Sentiments the note expresses a wish to satisfy.
    #[serde(default)]
    pub sentiments: Vec<String>,
    /// Resources the author needs.
    #[serde(default)]
    pub resources_needed: Vec<String>,
    /// Resources the author has available.
    #[serde(default)]
    pub resources_available: Vec<String>,
    /// Whether extraction failed and this is the empty fallback.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub used_fallback: bool,
}

impl NoteExtraction {
    /// Creates an extraction with the given lists.
    #[must_use]
    pub fn new(id: u64, needed: Vec<String>, available: Vec<String>) -> Self {
        Self {
            id,
            resources_needed: needed,
            resources_available: available,
            ..Self::default()
        }
    }

    /// The empty-lists result used when extraction fails.
    #[must_use]
    pub fn fallback(id: u64, original_note: impl Into<String>) -> Self {
        Self {
            id,
            original_note: original_note.into(),
            used_fallback: true,
            ..Self::default()
        }
    }

    /// Sets the original note text.
    #[must_use]
    pub fn with_original_note(mut self, note: impl Into<String>) -> Self {
        self.original_note = note.into();
        self
    }

    /// Sets the sentiments.
    #[must_use]
    pub fn with_sentiments(mut self, sentiments: Vec<String>) -> Self {
        self.sentiments = sentiments;
        self
    }

    /// Returns true if neither needs nor availabilities were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources_needed.is_empty() && self.resources_available.is_empty()
    }

    /// Builds an extraction from loosely-typed JSON.
    ///
    /// Missing lists default to empty and non-string list items are skipped.
    /// Returns `None` when the value is not an object or carries neither
    /// `resources_needed` nor `resources_available` as an array.
    ///
    /// `default_id` is used when the object has no integer `id`.
    #[must_use]
    pub fn from_value(value: &Value, default_id: u64) -> Option<Self> {
        let object = value.as_object()?;

        let needed = object.get(NEEDED_KEY).and_then(Value::as_array);
        let available = object.get(AVAILABLE_KEY).and_then(Value::as_array);
        if needed.is_none() && available.is_none() {
            return None;
        }

        let id = object.get("id").and_then(Value::as_u64).unwrap_or(default_id);
        let original_note = object
            .get("original_note")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let sentiments = object
            .get("sentiments")
            .and_then(Value::as_array)
            .map(|items| string_items(items))
            .unwrap_or_default();

        Some(Self {
            id,
            original_note,
            sentiments,
            resources_needed: needed.map(|items| string_items(items)).unwrap_or_default(),
            resources_available: available
                .map(|items| string_items(items))
                .unwrap_or_default(),
            used_fallback: false,
        })
    }
}

/// Collects the non-blank string items of a JSON array, trimmed.
fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
