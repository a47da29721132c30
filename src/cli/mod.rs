//! CLI support.
//!
//! Builders and input readers shared by the `hiddenthread` binary's
//! commands.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `process` | Extract, match and suggest over a JSON file of notes |
//! | `match` | Match pre-extracted notes, or a saved index snapshot |
//! | `snapshot` | Embed pre-extracted notes and save an index snapshot |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! # Full pipeline
//! hiddenthread process notes.json
//!
//! # Skip extraction
//! hiddenthread match extractions.json
//!
//! # Persist embeddings, then match from the snapshot
//! hiddenthread snapshot extractions.json --out index.json
//! hiddenthread match --snapshot index.json
//! ```

mod input;
mod llm_factory;

pub use input::{read_extractions, read_notes};
pub use llm_factory::{build_llm_provider, build_openai_client};

use crate::Result;
use crate::config::{HiddenThreadConfig, MatchingConfig};
use crate::embedding::{Embedder, FastEmbedEmbedder};
use crate::services::{LlmNoteExtractor, LlmSuggestionGenerator, MatchingPipeline, NoteProcessor};
use std::sync::Arc;

/// Builds the embedder for the configured width.
#[cfg(feature = "fastembed-embeddings")]
#[must_use]
pub fn build_embedder(_config: &MatchingConfig) -> Arc<dyn Embedder> {
    Arc::new(FastEmbedEmbedder::new())
}

/// Builds the embedder for the configured width.
#[cfg(not(feature = "fastembed-embeddings"))]
#[must_use]
pub fn build_embedder(config: &MatchingConfig) -> Arc<dyn Embedder> {
    tracing::debug!(
        dimensions = config.dimensions,
        "fastembed-embeddings disabled, using hash embeddings"
    );
    Arc::new(FastEmbedEmbedder::with_dimensions(config.dimensions))
}

/// Builds the matching pipeline with the LLM suggestion generator.
///
/// # Errors
///
/// Returns an error if the API key is missing, the matching config is
/// invalid, or the embedder width differs from the configured dimensions.
pub fn build_pipeline(config: &HiddenThreadConfig) -> Result<MatchingPipeline> {
    let llm = build_llm_provider(&config.llm)?;
    MatchingPipeline::new(
        build_embedder(&config.matching),
        Arc::new(LlmSuggestionGenerator::new(llm)),
        config.matching.clone(),
    )
}

/// Builds the note processor; extraction and suggestions share one provider.
///
/// # Errors
///
/// See [`build_pipeline`].
pub fn build_note_processor(config: &HiddenThreadConfig) -> Result<NoteProcessor> {
    let llm = build_llm_provider(&config.llm)?;
    let pipeline = MatchingPipeline::new(
        build_embedder(&config.matching),
        Arc::new(LlmSuggestionGenerator::new(Arc::clone(&llm))),
        config.matching.clone(),
    )?;
    Ok(NoteProcessor::new(
        Arc::new(LlmNoteExtractor::new(llm)),
        pipeline,
    ))
}

/// Builds a pipeline for embedding only; no API key is needed.
///
/// The suggestion generator fails every call, so this must not be used to
/// produce suggestions.
///
/// # Errors
///
/// Returns an error if the matching config is invalid or the embedder width
/// differs from the configured dimensions.
pub fn build_embedding_pipeline(config: &HiddenThreadConfig) -> Result<MatchingPipeline> {
    MatchingPipeline::new(
        build_embedder(&config.matching),
        Arc::new(|_: &str, _: &str| -> Result<String> {
            Err(crate::Error::Configuration(
                "suggestion generation is not configured".to_string(),
            ))
        }),
        config.matching.clone(),
    )
}
