//! Storage layer.
//!
//! The similarity index is the only stateful component of the pipeline:
//! - **Vector**: embedding storage and top-k inner-product search
//!   ([`FlatIndex`] exact, [`HnswIndex`] approximate)
//! - **Snapshot**: on-disk copy of one batch's entries and vectors
//!
//! Indexes are cheap to build and are constructed fresh for every batch.
//! Nothing in this module is shared between batches.

// Scores and positions are converted between f32/u64/usize.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod snapshot;
pub mod traits;
pub mod vector;

pub use snapshot::IndexSnapshot;
pub use traits::{RawMatch, VectorIndex};
pub use vector::{FlatIndex, HnswIndex, IndexKind, build_index};
