//! Business logic services.
//!
//! Services turn notes into entries, entries into matches and matches into
//! suggestions. Collaborators (embedder, extractor, suggestion generator) are
//! injected as trait objects.

mod entry_builder;
mod extraction;
mod match_filter;
mod notes;
mod pipeline;
mod suggestion;

pub use entry_builder::EntryBuilder;
pub use extraction::{LlmNoteExtractor, NoteExtractor};
pub use match_filter::MatchFilter;
pub use notes::NoteProcessor;
pub use pipeline::MatchingPipeline;
pub use suggestion::{FALLBACK_PREFIX, LlmSuggestionGenerator, SuggestionGenerator, fallback_text};
