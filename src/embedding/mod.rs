//! Embedding generation.
//!
//! Maps text to unit-norm vectors of a fixed width. The matching pipeline only
//! relies on that contract: same model, comparable vectors, unit norm, fixed
//! dimension.

// Hash-based pseudo-embeddings cast between integer and float widths.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

mod fastembed;

pub use fastembed::FastEmbedEmbedder;

use crate::Result;

/// Output width of all-MiniLM-L6-v2.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding generators.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Scales a vector to unit L2 norm in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
    if norm_sq <= 0.0 {
        return;
    }
    let inv_norm = norm_sq.sqrt().recip();
    for v in vector.iter_mut() {
        *v *= inv_norm;
    }
}

/// Inner product of two equal-length vectors.
///
/// On unit vectors this is the cosine similarity.
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
