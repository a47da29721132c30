//! usearch HNSW vector index.
//!
//! Provides approximate nearest neighbor search using a Hierarchical
//! Navigable Small World (HNSW) graph, for batches too large for the exact
//! [`FlatIndex`](super::FlatIndex).
//!
//! Only available with the `usearch-hnsw` feature. Without it,
//! [`HnswIndex::new`] returns [`Error::FeatureNotEnabled`].

use crate::storage::{RawMatch, VectorIndex};
use crate::{Error, Result};
use std::ops::Range;

/// HNSW connectivity parameter (M).
/// Higher values improve recall but use more memory.
#[cfg(feature = "usearch-hnsw")]
const HNSW_CONNECTIVITY: usize = 16;

/// HNSW expansion factor for construction (`ef_construction`).
#[cfg(feature = "usearch-hnsw")]
const HNSW_EXPANSION_ADD: usize = 128;

/// HNSW expansion factor for search (`ef`).
#[cfg(feature = "usearch-hnsw")]
const HNSW_EXPANSION_SEARCH: usize = 64;

// ============================================================================
// Native usearch Implementation (with feature)
// ============================================================================

#[cfg(feature = "usearch-hnsw")]
mod native {
    use super::{
        Error, HNSW_CONNECTIVITY, HNSW_EXPANSION_ADD, HNSW_EXPANSION_SEARCH, Range, RawMatch,
        Result, VectorIndex,
    };
    use crate::storage::vector::{check_dimensions, rank_hits};
    use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

    fn usearch_error(operation: &str, e: impl std::fmt::Display) -> Error {
        Error::OperationFailed {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Native usearch-based index using HNSW and the inner-product metric.
    ///
    /// usearch keys are the stored positions, so hits map straight back to
    /// entries without an id table.
    pub struct HnswIndex {
        dimensions: usize,
        index: Index,
    }

    impl HnswIndex {
        /// Creates an empty HNSW index.
        ///
        /// # Errors
        ///
        /// Returns an error if the native index cannot be created.
        pub fn new(dimensions: usize) -> Result<Self> {
            let options = IndexOptions {
                dimensions,
                metric: MetricKind::IP,
                quantization: ScalarKind::F32,
                connectivity: HNSW_CONNECTIVITY,
                expansion_add: HNSW_EXPANSION_ADD,
                expansion_search: HNSW_EXPANSION_SEARCH,
                multi: false,
            };

            let index = Index::new(&options).map_err(|e| usearch_error("create_usearch_index", e))?;
            Ok(Self { dimensions, index })
        }
    }

    impl VectorIndex for HnswIndex {
        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn len(&self) -> usize {
            self.index.size()
        }

        fn insert_batch(&mut self, vectors: &[Vec<f32>]) -> Result<Range<usize>> {
            check_dimensions(self.dimensions, vectors)?;

            let start = self.len();
            self.index
                .reserve(start + vectors.len())
                .map_err(|e| usearch_error("reserve_usearch_capacity", e))?;

            for (offset, vector) in vectors.iter().enumerate() {
                let key = (start + offset) as u64;
                self.index
                    .add(key, vector.as_slice())
                    .map_err(|e| usearch_error("usearch_add", e))?;
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

            let mut results = Vec::new();
            for (query_position, query) in queries.iter().enumerate() {
                let matches = self
                    .index
                    .search(query.as_slice(), top_k)
                    .map_err(|e| usearch_error("usearch_search", e))?;

                // For the IP metric usearch reports distance = 1 - dot product.
                let candidates = matches
                    .keys
                    .iter()
                    .zip(matches.distances.iter())
                    .map(|(&key, &distance)| (key as usize, 1.0 - distance))
                    .collect();
                results.extend(rank_hits(query_position, candidates, top_k, threshold));
            }
            Ok(results)
        }
    }
}

// ============================================================================
// Placeholder (without feature)
// ============================================================================

#[cfg(not(feature = "usearch-hnsw"))]
mod disabled {
    use super::{Error, Range, RawMatch, Result, VectorIndex};

    /// HNSW index placeholder.
    ///
    /// Cannot be constructed without the `usearch-hnsw` feature.
    #[derive(Debug)]
    pub enum HnswIndex {}

    impl HnswIndex {
        /// Always fails: the `usearch-hnsw` feature is not enabled.
        ///
        /// # Errors
        ///
        /// Always returns [`Error::FeatureNotEnabled`].
        pub fn new(_dimensions: usize) -> Result<Self> {
            Err(Error::FeatureNotEnabled("usearch-hnsw".to_string()))
        }
    }

    impl VectorIndex for HnswIndex {
        fn dimensions(&self) -> usize {
            match *self {}
        }

        fn len(&self) -> usize {
            match *self {}
        }

        fn insert_batch(&mut self, _vectors: &[Vec<f32>]) -> Result<Range<usize>> {
            match *self {}
        }

        fn search(
            &self,
            _queries: &[Vec<f32>],
            _top_k: usize,
            _threshold: f32,
        ) -> Result<Vec<RawMatch>> {
            match *self {}
        }
    }
}

#[cfg(feature = "usearch-hnsw")]
pub use native::HnswIndex;

#[cfg(not(feature = "usearch-hnsw"))]
pub use disabled::HnswIndex;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "usearch-hnsw"))]
    #[test]
    fn test_new_requires_feature() {
        assert!(matches!(
            HnswIndex::new(384),
            Err(Error::FeatureNotEnabled(ref name)) if name == "usearch-hnsw"
        ));
    }

    #[cfg(feature = "usearch-hnsw")]
    mod usearch_tests {
        use super::*;

        fn axis(dims: usize, i: usize) -> Vec<f32> {
            let mut v = vec![0.0; dims];
            v[i] = 1.0;
            v
        }

        #[test]
        fn test_insert_and_search() {
            let mut index = HnswIndex::new(4).expect("create");
            let vectors: Vec<_> = (0..4).map(|i| axis(4, i)).collect();
            assert_eq!(index.insert_batch(&vectors).expect("insert"), 0..4);
            assert_eq!(index.len(), 4);

            let results = index.search(&[axis(4, 2)], 3, 0.3).expect("search");
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].result_position, 2);
            assert!((results[0].score - 1.0).abs() < 1e-4);
        }

        #[test]
        fn test_dimension_mismatch() {
            let mut index = HnswIndex::new(4).expect("create");
            assert!(matches!(
                index.insert(&[1.0, 0.0]),
                Err(Error::DimensionMismatch { .. })
            ));
        }

        #[test]
        fn test_empty_index_search() {
            let index = HnswIndex::new(4).expect("create");
            assert!(index.search(&[axis(4, 0)], 5, 0.0).expect("search").is_empty());
        }
    }
}
