//! Exact brute-force vector index.

use super::{check_dimensions, rank_hits};
use crate::embedding::inner_product;
use crate::storage::{RawMatch, VectorIndex};
use crate::{Error, Result};
use std::ops::Range;

/// Exact inner-product index over a contiguous row-major buffer.
///
/// Every query is scored against every stored vector, which is O(n·d) per
/// query. At note-taking scale (hundreds to low thousands of phrases per
/// batch) this is fast and, unlike [`HnswIndex`](super::HnswIndex), exact.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Creates an empty index with room for `capacity` vectors.
    #[must_use]
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            dimensions,
            data: Vec::with_capacity(dimensions.saturating_mul(capacity)),
        }
    }

    /// Returns the vector stored at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        let end = start.checked_add(self.dimensions)?;
        self.data.get(start..end)
    }

    fn rows(&self) -> impl Iterator<Item = (usize, &[f32])> {
        self.data.chunks_exact(self.dimensions.max(1)).enumerate()
    }
}

impl VectorIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            return 0;
        }
        self.data.len() / self.dimensions
    }

    fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<Range<usize>> {
        if self.dimensions == 0 {
            return Err(Error::Configuration(
                "index dimensions must be greater than zero".to_string(),
            ));
        }
        check_dimensions(self.dimensions, vectors)?;

        let start = self.len();
        self.data.reserve(vectors.len() * self.dimensions);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(start..start + vectors.len())
    }

    fn search(
        &self,
        queries: &[Vec<f32>],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RawMatch>> {
        check_dimensions(self.dimensions, queries)?;
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(queries.len() * top_k.min(self.len()));
        for (query_position, query) in queries.iter().enumerate() {
            let candidates = self
                .rows()
                .map(|(position, row)| (position, inner_product(query, row)))
                .collect();
            results.extend(rank_hits(query_position, candidates, top_k, threshold));
        }
        Ok(results)
    }
}
