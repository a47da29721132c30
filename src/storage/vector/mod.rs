//! Vector index implementations.

mod flat;
mod usearch;

pub use flat::FlatIndex;
pub use usearch::HnswIndex;

use super::{RawMatch, VectorIndex};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which similarity index backs a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact brute-force inner-product search.
    #[default]
    Flat,
    /// Approximate HNSW search (requires the `usearch-hnsw` feature).
    Hnsw,
}

impl IndexKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hnsw => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flat" | "exact" => Ok(Self::Flat),
            "hnsw" | "usearch" => Ok(Self::Hnsw),
            other => Err(Error::Configuration(format!(
                "unknown index kind '{other}' (expected 'flat' or 'hnsw')"
            ))),
        }
    }
}

/// Builds an empty index of the given kind.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for zero dimensions and
/// [`Error::FeatureNotEnabled`] when `Hnsw` is requested without the
/// `usearch-hnsw` feature.
pub fn build_index(kind: IndexKind, dimensions: usize) -> Result<Box<dyn VectorIndex>> {
    if dimensions == 0 {
        return Err(Error::Configuration(
            "index dimensions must be greater than zero".to_string(),
        ));
    }

    tracing::debug!(kind = %kind, dimensions, "Building vector index");
    match kind {
        IndexKind::Flat => Ok(Box::new(FlatIndex::new(dimensions))),
        IndexKind::Hnsw => Ok(Box::new(HnswIndex::new(dimensions)?)),
    }
}

/// Validates that every vector has the configured width.
pub(crate) fn check_dimensions(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(bad) => Err(Error::DimensionMismatch {
            expected,
            actual: bad.len(),
        }),
        None => Ok(()),
    }
}

/// Turns one query's scored candidates into its final hit list.
///
/// Keeps scores strictly above `threshold`, orders by descending score with
/// ascending position breaking ties, and truncates to `top_k`.
pub(crate) fn rank_hits(
    query_position: usize,
    mut candidates: Vec<(usize, f32)>,
    top_k: usize,
    threshold: f32,
) -> impl Iterator<Item = RawMatch> {
    candidates.retain(|&(_, score)| score > threshold);
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.truncate(top_k);
    candidates
        .into_iter()
        .map(move |(position, score)| RawMatch::new(query_position, position, score))
}
