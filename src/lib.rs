//! # HiddenThread
//!
//! Finds the hidden threads between personal notes.
//!
//! Each note is broken down (by an LLM) into the resources its author *needs*
//! and the resources they already have *available*. Every phrase is embedded
//! into a shared vector space, needs are matched against availabilities by
//! cosine similarity, and every matched pair is turned into an actionable
//! suggestion.
//!
//! ## Pipeline
//!
//! ```text
//! notes ─▶ extraction ─▶ EntryBuilder ─▶ Embedder ─▶ VectorIndex ─▶ MatchFilter ─▶ suggestions
//! ```
//!
//! - [`services::EntryBuilder`] flattens per-note extraction results into
//!   positioned [`models::Entry`] values.
//! - [`storage::VectorIndex`] stores embeddings by position and answers top-k
//!   inner-product queries.
//! - [`services::MatchFilter`] keeps only need → availability pairs.
//! - [`services::MatchingPipeline`] wires it all together and attaches
//!   suggestion text per match.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hiddenthread::embedding::FastEmbedEmbedder;
//! use hiddenthread::services::{LlmSuggestionGenerator, MatchingPipeline};
//! use hiddenthread::config::MatchingConfig;
//!
//! let pipeline = MatchingPipeline::new(
//!     Arc::new(FastEmbedEmbedder::new()),
//!     Arc::new(LlmSuggestionGenerator::new(llm)),
//!     MatchingConfig::default(),
//! )?;
//! let suggestions = pipeline.run(&extractions)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// fastembed pulls several versions of the same transitive crates.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{HiddenThreadConfig, MatchingConfig};
pub use embedding::Embedder;
pub use llm::LlmProvider;
pub use models::{
    BatchResult, Entry, EntryKind, Match, NoteExtraction, ProcessedNote, RelatedNotes,
    Suggestion, SuggestionId,
};
pub use services::{
    EntryBuilder, MatchFilter, MatchingPipeline, NoteExtractor, NoteProcessor,
    SuggestionGenerator,
};
pub use storage::{IndexKind, IndexSnapshot, RawMatch, VectorIndex};

/// Error type for hiddenthread operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty text handed to an embedder, unreadable input files |
/// | `OperationFailed` | HTTP calls, model loading, file I/O, JSON parsing |
/// | `DimensionMismatch` | A vector's width differs from the configured index width |
/// | `IntegrityViolation` | Entry positions and stored vectors no longer line up |
/// | `Configuration` | Missing credentials, invalid settings |
/// | `FeatureNotEnabled` | Selecting a backend that was not compiled in |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - An LLM or embedding request fails at the transport level
    /// - The embedding model cannot be loaded
    /// - Snapshot or config files cannot be read or written
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A vector did not have the configured dimension.
    ///
    /// This is a configuration error: the embedding model and the index
    /// disagree, and there is no safe degraded mode.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension actually received.
        actual: usize,
    },

    /// Stored vectors and entry metadata are out of sync.
    ///
    /// Continuing would silently pair the wrong entries, so this is never
    /// recovered from.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

/// Result type alias for hiddenthread operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::DimensionMismatch {
            expected: 384,
            actual: 128,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 128");

        let err = Error::FeatureNotEnabled("usearch-hnsw".to_string());
        assert_eq!(
            err.to_string(),
            "feature not enabled: usearch-hnsw (compile with --features usearch-hnsw)"
        );
    }
}
