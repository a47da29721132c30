//! Data models for hiddenthread.
//!
//! Everything that crosses a component boundary is one of these types.
//! Components refer to each other's data by plain entry position, never by
//! shared mutable state.

mod entry;
mod extraction;
mod matching;
mod note;
mod suggestion;

pub use entry::{Entry, EntryKind};
pub use extraction::{AVAILABLE_KEY, NEEDED_KEY, NoteExtraction};
pub use matching::Match;
pub use note::{BatchResult, ProcessedNote};
pub use suggestion::{RelatedNotes, Suggestion, SuggestionId};
