//! Batch output types.

use super::{NoteExtraction, Suggestion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one note after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedNote {
    /// Note identifier (index within the submitted batch).
    pub id: u64,
    /// Original note text.
    pub content: String,
    /// When the note was processed.
    pub processed_at: DateTime<Utc>,
    /// Extracted sentiments.
    pub sentiments: Vec<String>,
    /// Extracted needs.
    pub resources_needed: Vec<String>,
    /// Extracted availabilities.
    pub resources_available: Vec<String>,
    /// Whether extraction failed and the note contributed nothing.
    pub used_fallback: bool,
}

impl ProcessedNote {
    /// Builds a summary from an extraction.
    #[must_use]
    pub fn from_extraction(extraction: &NoteExtraction, processed_at: DateTime<Utc>) -> Self {
        Self {
            id: extraction.id,
            content: extraction.original_note.clone(),
            processed_at,
            sentiments: extraction.sentiments.clone(),
            resources_needed: extraction.resources_needed.clone(),
            resources_available: extraction.resources_available.clone(),
            used_fallback: extraction.used_fallback,
        }
    }
}

/// Everything produced for one submitted batch of notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// One summary per submitted note, in submission order.
    pub processed_notes: Vec<ProcessedNote>,
    /// Suggestions in match order.
    pub suggestions: Vec<Suggestion>,
}

impl BatchResult {
    /// Number of suggestions that carry generated (non-fallback) text.
    #[must_use]
    pub fn generated_count(&self) -> usize {
        self.suggestions.iter().filter(|s| !s.fallback).count()
    }
}
