//! Match types.

use serde::{Deserialize, Serialize};

/// A need → availability connection that survived filtering.
///
/// Both positions index into the batch's entry list. The query side is always
/// a need and the result side always an availability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Position of the need entry.
    pub query_position: usize,
    /// Position of the availability entry.
    pub result_position: usize,
    /// Inner-product similarity of the two embeddings.
    pub score: f32,
}

impl Match {
    /// Creates a new match.
    #[must_use]
    pub const fn new(query_position: usize, result_position: usize, score: f32) -> Self {
        Self {
            query_position,
            result_position,
            score,
        }
    }

    /// Returns the `(query, result)` position pair.
    #[must_use]
    pub const fn pair(&self) -> (usize, usize) {
        (self.query_position, self.result_position)
    }
}
