//! Suggestion types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential suggestion identifier, starting at 1 within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(u32);

impl SuggestionId {
    /// The first identifier handed out in a batch.
    pub const FIRST: Self = Self(1);

    /// Creates an identifier from a raw number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw number.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the identifier following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sugg_{}", self.0)
    }
}

/// The notes a suggestion connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedNotes {
    /// Note that contained the need.
    pub need_note_id: u64,
    /// Note that contained the availability.
    pub availability_note_id: u64,
}

/// A match plus its generated explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Sequential identifier.
    pub id: SuggestionId,
    /// Need text.
    pub need: String,
    /// Availability text.
    pub availability: String,
    /// Generated suggestion, or the fallback marker when generation failed.
    pub suggestion: String,
    /// Similarity score of the underlying match.
    pub score: f32,
    /// Originating notes.
    pub related_notes: RelatedNotes,
    /// Whether `suggestion` holds the fallback text.
    #[serde(default)]
    pub fallback: bool,
}
