//! Entry list construction.
//!
//! This is the one place loosely-typed extraction output enters the core.
//! Positions are handed out here and nowhere else.

use crate::models::{Entry, EntryKind, NoteExtraction};
use serde_json::Value;
use std::ops::Range;

/// Flattens per-note extraction results into one positioned entry list.
///
/// For each note, in the order pushed, needs come first and availabilities
/// immediately after. Positions start at 0 and follow push order exactly, so
/// they can be used as row ids when the entries' embeddings are inserted
/// into an index in the same order.
///
/// Blank phrases are skipped and do not consume a position.
#[derive(Debug, Default)]
pub struct EntryBuilder {
    entries: Vec<Entry>,
}

impl EntryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds the entry list for a batch of extractions.
    #[must_use]
    pub fn build(extractions: &[NoteExtraction]) -> Vec<Entry> {
        let mut builder = Self::new();
        for extraction in extractions {
            builder.push_extraction(extraction);
        }
        builder.into_entries()
    }

    /// Builds the entry list from raw extraction JSON.
    ///
    /// Each value's note id is its `id` field, or its index in `values`.
    /// Malformed values contribute no entries.
    #[must_use]
    pub fn from_values(values: &[Value]) -> Vec<Entry> {
        let mut builder = Self::new();
        for (index, value) in values.iter().enumerate() {
            builder.push_value(value, index as u64);
        }
        builder.into_entries()
    }

    /// Appends one note's needs then availabilities.
    ///
    /// Returns the positions assigned to the new entries.
    pub fn push_extraction(&mut self, extraction: &NoteExtraction) -> Range<usize> {
        self.push_note(
            extraction.id,
            &extraction.resources_needed,
            &extraction.resources_available,
        )
    }

    /// Appends one note given as raw JSON.
    ///
    /// A value that is not an object, or that has neither a
    /// `resources_needed` nor a `resources_available` list, is logged and
    /// contributes nothing.
    pub fn push_value(&mut self, value: &Value, default_id: u64) -> Range<usize> {
        match NoteExtraction::from_value(value, default_id) {
            Some(extraction) => self.push_extraction(&extraction),
            None => {
                tracing::warn!(
                    note_id = default_id,
                    "Skipping malformed extraction result"
                );
                let end = self.entries.len();
                end..end
            },
        }
    }

    /// Appends needs then availabilities for one note.
    pub fn push_note(
        &mut self,
        note_id: u64,
        needed: &[String],
        available: &[String],
    ) -> Range<usize> {
        let start = self.entries.len();
        self.push_phrases(note_id, EntryKind::Need, needed);
        self.push_phrases(note_id, EntryKind::Availability, available);
        start..self.entries.len()
    }

    fn push_phrases(&mut self, note_id: u64, kind: EntryKind, phrases: &[String]) {
        for phrase in phrases.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let position = self.entries.len();
            self.entries.push(Entry::new(phrase, kind, note_id, position));
        }
    }

    /// Number of entries so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the builder, returning the entries in position order.
    #[must_use]
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}
