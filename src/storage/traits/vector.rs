//! Vector index trait.
//!
//! Abstraction over similarity search backends. Both operations work on
//! plain positions: the n-th vector ever inserted into an index is stored at
//! position `n - 1`, and search results refer back to those positions.
//!
//! # Available Implementations
//!
//! | Backend | Search | Configuration |
//! |---------|--------|---------------|
//! | `FlatIndex` | Exact brute force | Default, no extra deps |
//! | `HnswIndex` | Approximate (HNSW graph) | Requires `usearch-hnsw` feature |
//!
//! # Usage Example
//!
//! ```rust
//! use hiddenthread::storage::{FlatIndex, VectorIndex};
//!
//! let mut index = FlatIndex::new(2);
//! let positions = index.insert_batch(&[vec![1.0, 0.0], vec![0.0, 1.0]])?;
//! assert_eq!(positions, 0..2);
//!
//! // Searching the stored vectors against themselves.
//! let results = index.search(&[vec![1.0, 0.0]], 2, 0.3)?;
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].result_position, 0);
//! # Ok::<(), hiddenthread::Error>(())
//! ```
//!
//! # Ordering
//!
//! Results are grouped by query position (ascending). Within a group, scores
//! are non-increasing and equal scores are ordered by ascending result
//! position, so a given index and query set always yields the same list.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One raw hit from [`VectorIndex::search`].
///
/// No filtering beyond the threshold has been applied: a query may hit
/// itself, and kinds are not yet considered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    /// Index of the query within the submitted query batch.
    pub query_position: usize,
    /// Stored position of the hit.
    pub result_position: usize,
    /// Inner product of query and hit.
    pub score: f32,
}

impl RawMatch {
    /// Creates a raw match.
    #[must_use]
    pub const fn new(query_position: usize, result_position: usize, score: f32) -> Self {
        Self {
            query_position,
            result_position,
            score,
        }
    }
}

/// Trait for vector similarity indexes.
///
/// Implementations must be append-only: positions are never reused or
/// reordered, and there is no in-place delete. To drop vectors, build a
/// new index.
///
/// Implementations are not internally synchronized for writes. Callers that
/// share one index must serialize each insert/search sequence; the pipeline
/// avoids this by building one index per batch.
pub trait VectorIndex: Send + Sync {
    /// Configured vector width.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Returns true if no vectors are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends vectors in order and returns the positions they were given.
    ///
    /// The batch is validated up front; on error nothing is inserted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::Error::DimensionMismatch)
    /// if any vector's width differs from [`dimensions`](Self::dimensions).
    fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<Range<usize>>;

    /// Appends a single vector as a one-row batch and returns its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::Error::DimensionMismatch)
    /// if the vector's width differs from [`dimensions`](Self::dimensions).
    fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.insert_batch(&[vector.to_vec()]).map(|range| range.start)
    }

    /// Returns up to `top_k` hits per query whose score is strictly greater
    /// than `threshold`.
    ///
    /// An empty index or `top_k == 0` yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::Error::DimensionMismatch)
    /// if any query's width differs from [`dimensions`](Self::dimensions).
    fn search(&self, queries: &[Vec<f32>], top_k: usize, threshold: f32)
    -> Result<Vec<RawMatch>>;
}
