//! Entry types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an extracted phrase describes something wanted or something on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A resource the note's author needs.
    Need,
    /// A resource the note's author has access to.
    Availability,
}

impl EntryKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Need => "need",
            Self::Availability => "availability",
        }
    }

    /// Parses a kind from a string.
    ///
    /// Returns `None` for unknown strings.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "need" | "needs" | "resources_needed" => Some(Self::Need),
            "availability" | "availabilities" | "resources_available" => {
                Some(Self::Availability)
            },
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One extracted phrase with a stable position in the batch.
///
/// The position is the join key between the entry list, the embedding array
/// and the row ids of the [`VectorIndex`](crate::storage::VectorIndex). It is
/// assigned once, in insertion order starting at 0, and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    text: String,
    kind: EntryKind,
    source_note_id: u64,
    position: usize,
}

impl Entry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        kind: EntryKind,
        source_note_id: u64,
        position: usize,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            source_note_id,
            position,
        }
    }

    /// The phrase itself.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Need or availability.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Identifier of the note this phrase was extracted from.
    #[must_use]
    pub const fn source_note_id(&self) -> u64 {
        self.source_note_id
    }

    /// Position within the flat entry list.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns true if this entry is a need.
    #[must_use]
    pub fn is_need(&self) -> bool {
        self.kind == EntryKind::Need
    }

    /// Returns true if this entry is an availability.
    #[must_use]
    pub fn is_availability(&self) -> bool {
        self.kind == EntryKind::Availability
    }
}
