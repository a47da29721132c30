//! FastEmbed-based embedder.
//!
//! Provides semantic embeddings using the all-MiniLM-L6-v2 model via fastembed-rs.
//! When the `fastembed-embeddings` feature is enabled, this uses real ONNX-based
//! semantic embeddings. Otherwise, falls back to deterministic hash-based pseudo-embeddings
//! of the same width.

use super::{DEFAULT_DIMENSIONS, Embedder, normalize};
use crate::{Error, Result};

/// Rejects batches containing blank phrases; the model cannot embed them.
fn ensure_non_empty(texts: &[&str]) -> Result<()> {
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("Cannot embed empty text".to_string()));
    }
    Ok(())
}

// ============================================================================
// Native FastEmbed Implementation (with feature)
// ============================================================================

#[cfg(feature = "fastembed-embeddings")]
mod native {
    use super::{DEFAULT_DIMENSIONS, Embedder, Error, Result, ensure_non_empty, normalize};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::{Mutex, OnceLock, PoisonError};
    use std::time::Instant;

    /// Process-wide model, loaded on first use.
    static EMBEDDING_MODEL: OnceLock<Mutex<fastembed::TextEmbedding>> = OnceLock::new();

    /// `FastEmbed` embedder using all-MiniLM-L6-v2.
    ///
    /// The model is lazily loaded on the first embed call.
    pub struct FastEmbedEmbedder {
        model_name: &'static str,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new `FastEmbed` embedder.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                model_name: "all-MiniLM-L6-v2",
            }
        }

        /// Returns the model name.
        #[must_use]
        pub const fn model_name(&self) -> &'static str {
            self.model_name
        }

        /// Gets or initializes the embedding model.
        ///
        /// The first call blocks while the ONNX model is downloaded and loaded.
        fn get_model() -> Result<&'static Mutex<fastembed::TextEmbedding>> {
            if let Some(model) = EMBEDDING_MODEL.get() {
                return Ok(model);
            }

            tracing::info!("Loading embedding model (first use)...");
            let start = Instant::now();

            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false);
            let model =
                fastembed::TextEmbedding::try_new(options).map_err(|e| Error::OperationFailed {
                    operation: "load_embedding_model".to_string(),
                    cause: e.to_string(),
                })?;

            tracing::info!(
                elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                model = "all-MiniLM-L6-v2",
                "Embedding model loaded"
            );

            // Another thread may have won the race; either model is fine.
            let _ = EMBEDDING_MODEL.set(Mutex::new(model));
            EMBEDDING_MODEL.get().ok_or_else(|| Error::OperationFailed {
                operation: "get_embedding_model".to_string(),
                cause: "model initialization race".to_string(),
            })
        }

        /// Runs the model over a batch, converting ONNX panics into errors.
        fn run(operation: &'static str, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            let model = Self::get_model()?;
            let batch_size = texts.len();

            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut guard = model.lock().unwrap_or_else(PoisonError::into_inner);
                guard.embed(texts, None)
            }));

            let mut embeddings = result
                .map_err(|panic_info| {
                    let panic_msg = panic_info
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic_info.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        panic_message = %panic_msg,
                        batch_size,
                        "ONNX runtime panicked during embedding"
                    );
                    Error::OperationFailed {
                        operation: operation.to_string(),
                        cause: format!("ONNX runtime panic: {panic_msg}"),
                    }
                })?
                .map_err(|e| Error::OperationFailed {
                    operation: operation.to_string(),
                    cause: e.to_string(),
                })?;

            for embedding in &mut embeddings {
                normalize(embedding);
            }
            Ok(embeddings)
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            Self::DEFAULT_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            ensure_non_empty(&[text])?;
            Self::run("embed", vec![text.to_string()])?
                .into_iter()
                .next()
                .ok_or_else(|| Error::OperationFailed {
                    operation: "embed".to_string(),
                    cause: "No embedding returned from model".to_string(),
                })
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            ensure_non_empty(texts)?;
            Self::run(
                "embed_batch",
                texts.iter().map(|s| (*s).to_string()).collect(),
            )
        }
    }
}

// ============================================================================
// Fallback Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "fastembed-embeddings"))]
mod fallback {
    use super::{DEFAULT_DIMENSIONS, Embedder, Result, ensure_non_empty, normalize};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Caps the work done per text.
    const MAX_WORDS: usize = 1000;

    /// `FastEmbed` stand-in producing hash-based pseudo-embeddings.
    ///
    /// Vectors are deterministic and unit-norm, so the index and filter behave
    /// exactly as with the real model, but texts sharing no words are not
    /// similar. Enable `fastembed-embeddings` for semantic matching.
    pub struct FastEmbedEmbedder {
        dimensions: usize,
    }

    impl FastEmbedEmbedder {
        /// Default embedding dimensions for all-MiniLM-L6-v2.
        pub const DEFAULT_DIMENSIONS: usize = DEFAULT_DIMENSIONS;

        /// Creates a new embedder with the default width.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                dimensions: Self::DEFAULT_DIMENSIONS,
            }
        }

        /// Creates a new embedder with a custom width.
        #[must_use]
        pub const fn with_dimensions(dimensions: usize) -> Self {
            Self { dimensions }
        }

        fn pseudo_embed(&self, text: &str) -> Vec<f32> {
            let mut embedding = vec![0.0f32; self.dimensions];
            if self.dimensions == 0 {
                return embedding;
            }

            for word in text.split_whitespace().take(MAX_WORDS) {
                let mut hasher = DefaultHasher::new();
                word.to_lowercase().hash(&mut hasher);
                let hash = hasher.finish();
                for j in 0..8 {
                    let idx = ((hash >> (j * 8)) as usize) % self.dimensions;
                    let value = ((hash >> (j * 4)) & 0xFF) as f32 / 255.0 - 0.5;
                    embedding[idx] += value;
                }
            }

            normalize(&mut embedding);
            embedding
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            ensure_non_empty(&[text])?;
            tracing::trace!("Using pseudo-embedding (fastembed-embeddings feature not enabled)");
            Ok(self.pseudo_embed(text))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            ensure_non_empty(texts)?;
            Ok(texts.iter().map(|t| self.pseudo_embed(t)).collect())
        }
    }
}

#[cfg(feature = "fastembed-embeddings")]
pub use native::FastEmbedEmbedder;

#[cfg(not(feature = "fastembed-embeddings"))]
pub use fallback::FastEmbedEmbedder;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::inner_product;

    fn magnitude(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_embedder_dimensions() {
        let embedder = FastEmbedEmbedder::default();
        assert_eq!(embedder.dimensions(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_embed_empty_text_fails() {
        let embedder = FastEmbedEmbedder::new();
        assert!(embedder.embed("").is_err());
        assert!(embedder.embed("   ").is_err());
    }

    #[test]
    fn test_embed_batch_empty_list() {
        let embedder = FastEmbedEmbedder::new();
        let result = embedder.embed_batch(&[]).expect("embed_batch failed");
        assert!(result.is_empty());
    }

    #[test]
    fn test_embed_batch_with_blank_fails() {
        let embedder = FastEmbedEmbedder::new();
        assert!(embedder.embed_batch(&["books", "", "time"]).is_err());
    }

    #[cfg(not(feature = "fastembed-embeddings"))]
    mod fallback_tests {
        use super::*;

        #[test]
        fn test_embed_normalized_and_sized() {
            let embedder = FastEmbedEmbedder::new();
            let emb = embedder.embed("access to a free library").expect("embed failed");
            assert_eq!(emb.len(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
            assert!((magnitude(&emb) - 1.0).abs() < 1e-4);
        }

        #[test]
        fn test_embed_deterministic() {
            let embedder = FastEmbedEmbedder::new();
            let a = embedder.embed("quiet reading space").expect("embed failed");
            let b = embedder.embed("quiet reading space").expect("embed failed");
            assert_eq!(a, b);
        }

        #[test]
        fn test_shared_words_are_closer() {
            let embedder = FastEmbedEmbedder::new();
            let books = embedder.embed("books to read").expect("embed failed");
            let more_books = embedder.embed("books").expect("embed failed");
            let unrelated = embedder.embed("bicycle repair").expect("embed failed");
            assert!(inner_product(&books, &more_books) > inner_product(&books, &unrelated));
        }

        #[test]
        fn test_batch_matches_single() {
            let embedder = FastEmbedEmbedder::with_dimensions(64);
            let batch = embedder
                .embed_batch(&["daily free time", "guitar lessons"])
                .expect("embed_batch failed");
            assert_eq!(batch.len(), 2);
            assert_eq!(batch[1], embedder.embed("guitar lessons").expect("embed failed"));
        }
    }

    #[cfg(feature = "fastembed-embeddings")]
    mod fastembed_tests {
        use super::*;

        #[test]
        fn test_embed_normalized_and_sized() {
            let embedder = FastEmbedEmbedder::new();
            let emb = embedder.embed("access to a free library").expect("embed failed");
            assert_eq!(emb.len(), FastEmbedEmbedder::DEFAULT_DIMENSIONS);
            assert!((magnitude(&emb) - 1.0).abs() < 0.01);
        }

        #[test]
        fn test_semantic_similarity_related_text() {
            let embedder = FastEmbedEmbedder::new();
            let books = embedder.embed("books to read").expect("embed failed");
            let library = embedder.embed("access to free library").expect("embed failed");
            let bike = embedder.embed("bicycle chain grease").expect("embed failed");
            assert!(inner_product(&books, &library) > inner_product(&books, &bike));
        }
    }
}
