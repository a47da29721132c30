//! Storage traits.

mod vector;

pub use vector::{RawMatch, VectorIndex};
