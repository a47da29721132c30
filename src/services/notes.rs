//! End-to-end note processing.

use crate::models::{BatchResult, NoteExtraction, ProcessedNote};
use crate::services::{MatchingPipeline, NoteExtractor};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

/// Runs extraction over raw notes, then the matching pipeline.
pub struct NoteProcessor {
    extractor: Arc<dyn NoteExtractor>,
    pipeline: MatchingPipeline,
}

impl NoteProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(extractor: Arc<dyn NoteExtractor>, pipeline: MatchingPipeline) -> Self {
        Self {
            extractor,
            pipeline,
        }
    }

    /// Returns the matching pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &MatchingPipeline {
        &self.pipeline
    }

    /// Extracts every note; the note id is its index in `notes`.
    #[must_use]
    pub fn extract_notes(&self, notes: &[String]) -> Vec<NoteExtraction> {
        notes
            .iter()
            .enumerate()
            .map(|(index, note)| self.extractor.extract(index as u64, note))
            .collect()
    }

    /// Processes a batch of notes.
    ///
    /// A note whose extraction fails still appears in `processed_notes`,
    /// flagged as a fallback, and simply contributes no entries.
    ///
    /// # Errors
    ///
    /// Returns an error only for batch-fatal failures (embedding, index
    /// integrity). Zero notes yields an empty result.
    pub fn process_notes(&self, notes: &[String]) -> Result<BatchResult> {
        let _span = tracing::info_span!("notes.process", notes = notes.len()).entered();

        if notes.is_empty() {
            return Ok(BatchResult::default());
        }

        let extractions = self.extract_notes(notes);
        let fallbacks = extractions.iter().filter(|e| e.used_fallback).count();
        if fallbacks > 0 {
            tracing::warn!(fallbacks, "Some notes could not be extracted");
        }

        let processed_notes = extractions
            .iter()
            .map(|extraction| ProcessedNote::from_extraction(extraction, Utc::now()))
            .collect();
        let suggestions = self.pipeline.run(&extractions)?;

        Ok(BatchResult {
            processed_notes,
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::embedding::FastEmbedEmbedder;

    fn keyword_extractor(id: u64, text: &str) -> NoteExtraction {
        match text.split_once(" / ") {
            Some((needed, available)) => {
                NoteExtraction::new(id, vec![needed.to_string()], vec![available.to_string()])
            },
            None => NoteExtraction::fallback(id, text),
        }
    }

    fn processor() -> NoteProcessor {
        let pipeline = MatchingPipeline::new(
            Arc::new(FastEmbedEmbedder::new()),
            Arc::new(|need: &str, availability: &str| -> Result<String> {
                Ok(format!("{need} + {availability}"))
            }),
            MatchingConfig::default(),
        )
        .expect("pipeline");
        NoteProcessor::new(Arc::new(keyword_extractor), pipeline)
    }

    #[test]
    fn test_zero_notes() {
        let result = processor().process_notes(&[]).expect("process");
        assert!(result.processed_notes.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_processed_notes_keep_ids_and_fallback_flag() {
        let notes = vec![
            "a used bicycle / a quiet study room".to_string(),
            "unparseable".to_string(),
        ];
        let result = processor().process_notes(&notes).expect("process");

        assert_eq!(result.processed_notes.len(), 2);
        assert_eq!(result.processed_notes[0].id, 0);
        assert_eq!(result.processed_notes[0].resources_needed, vec!["a used bicycle"]);
        assert!(!result.processed_notes[0].used_fallback);
        assert_eq!(result.processed_notes[1].id, 1);
        assert_eq!(result.processed_notes[1].content, "unparseable");
        assert!(result.processed_notes[1].used_fallback);
    }

    #[test]
    fn test_identical_phrases_across_notes_are_matched() {
        let notes = vec![
            "guitar lessons / spare bedroom".to_string(),
            "a place to stay / guitar lessons".to_string(),
        ];
        let result = processor().process_notes(&notes).expect("process");

        let pair = result
            .suggestions
            .iter()
            .find(|s| s.need == "guitar lessons" && s.availability == "guitar lessons")
            .expect("identical phrases should match");
        assert_eq!(pair.related_notes.need_note_id, 0);
        assert_eq!(pair.related_notes.availability_note_id, 1);
    }
}
