//! Note extraction.
//!
//! Turns a free-text note into sentiments, needs and availabilities.
//! Extraction never fails a batch: any LLM or parse failure degrades to the
//! empty fallback for that note only.

use crate::llm::{LlmProvider, parse_json_response, prompts};
use crate::models::NoteExtraction;
use std::sync::Arc;

/// Extracts structured needs and availabilities from one note.
pub trait NoteExtractor: Send + Sync {
    /// Extracts from `text`, tagging the result with `note_id`.
    ///
    /// Implementations return [`NoteExtraction::fallback`] instead of an
    /// error when extraction fails.
    fn extract(&self, note_id: u64, text: &str) -> NoteExtraction;
}

impl<F> NoteExtractor for F
where
    F: Fn(u64, &str) -> NoteExtraction + Send + Sync,
{
    fn extract(&self, note_id: u64, text: &str) -> NoteExtraction {
        self(note_id, text)
    }
}

/// LLM-backed extractor.
pub struct LlmNoteExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmNoteExtractor {
    /// Creates an extractor that shares `llm` with other services.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn try_extract(&self, note_id: u64, text: &str) -> crate::Result<NoteExtraction> {
        let response = self.llm.complete_with_system(
            prompts::EXTRACTION_SYSTEM_PROMPT,
            &prompts::extraction_prompt(text),
        )?;
        let value = parse_json_response("extract_note", &response)?;

        NoteExtraction::from_value(&value, note_id).ok_or_else(|| crate::Error::OperationFailed {
            operation: "extract_note".to_string(),
            cause: "response has no resources_needed or resources_available list".to_string(),
        })
    }
}

impl NoteExtractor for LlmNoteExtractor {
    fn extract(&self, note_id: u64, text: &str) -> NoteExtraction {
        let _span = tracing::info_span!("note.extract", note_id, provider = self.llm.name())
            .entered();

        if text.trim().is_empty() {
            return NoteExtraction::new(note_id, Vec::new(), Vec::new());
        }

        match self.try_extract(note_id, text) {
            Ok(extraction) => {
                tracing::debug!(
                    needed = extraction.resources_needed.len(),
                    available = extraction.resources_available.len(),
                    "Extracted note"
                );
                NoteExtraction {
                    id: note_id,
                    ..extraction
                }
                .with_original_note(text)
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM extraction failed, using fallback");
                metrics::counter!("extraction_fallbacks_total").increment(1);
                NoteExtraction::fallback(note_id, text)
            },
        }
    }
}
