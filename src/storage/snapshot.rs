//! Index snapshots.
//!
//! A snapshot is one batch's entries and their embeddings written to a
//! single JSON file. Indexes themselves are never serialized: loading a
//! snapshot validates it and rebuilds a fresh index from the stored vectors,
//! so positions in the restored index line up with the stored entries.

use super::{IndexKind, VectorIndex, build_index};
use crate::models::Entry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Entries plus their embeddings, aligned by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    dimensions: usize,
    entries: Vec<Entry>,
    vectors: Vec<Vec<f32>>,
}

impl IndexSnapshot {
    /// Creates a snapshot, checking that entries and vectors line up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if a vector has the wrong width,
    /// or [`Error::IntegrityViolation`] if entries and vectors disagree.
    pub fn new(dimensions: usize, entries: Vec<Entry>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let snapshot = Self {
            dimensions,
            entries,
            vectors,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Vector width.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Stored entries, in position order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Stored embeddings, in position order.
    #[must_use]
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Splits the snapshot into its entries and vectors.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Entry>, Vec<Vec<f32>>) {
        (self.entries, self.vectors)
    }

    /// Checks the snapshot's internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if a vector has the wrong width,
    /// or [`Error::IntegrityViolation`] if the entry and vector counts differ
    /// or an entry's position does not match its index in the list.
    pub fn validate(&self) -> Result<()> {
        if self.entries.len() != self.vectors.len() {
            return Err(Error::IntegrityViolation(format!(
                "snapshot holds {} entries but {} vectors",
                self.entries.len(),
                self.vectors.len()
            )));
        }

        if let Some((index, entry)) = self
            .entries
            .iter()
            .enumerate()
            .find(|(index, entry)| entry.position() != *index)
        {
            return Err(Error::IntegrityViolation(format!(
                "entry at index {index} claims position {}",
                entry.position()
            )));
        }

        super::vector::check_dimensions(self.dimensions, &self.vectors)
    }

    /// Writes the snapshot to `path` as JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(self).map_err(|e| Error::OperationFailed {
            operation: "serialize_snapshot".to_string(),
            cause: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_snapshot_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        fs::write(path, content).map_err(|e| Error::OperationFailed {
            operation: "write_snapshot".to_string(),
            cause: e.to_string(),
        })?;

        tracing::info!(
            path = %path.display(),
            entries = self.entries.len(),
            dimensions = self.dimensions,
            "Saved index snapshot"
        );
        Ok(())
    }

    /// Reads and validates a snapshot written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the snapshot was written with a
    /// different width than `expected_dimensions`, an integrity error if it
    /// is internally inconsistent, or an error if it cannot be read.
    pub fn load(path: &Path, expected_dimensions: usize) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_snapshot".to_string(),
            cause: e.to_string(),
        })?;

        let snapshot: Self = serde_json::from_str(&content).map_err(|e| Error::OperationFailed {
            operation: "parse_snapshot".to_string(),
            cause: e.to_string(),
        })?;

        if snapshot.dimensions != expected_dimensions {
            return Err(Error::DimensionMismatch {
                expected: expected_dimensions,
                actual: snapshot.dimensions,
            });
        }
        snapshot.validate()?;

        tracing::debug!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            "Loaded index snapshot"
        );
        Ok(snapshot)
    }

    /// Builds a fresh index of `kind` holding the snapshot's vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be built.
    pub fn restore(&self, kind: IndexKind) -> Result<Box<dyn VectorIndex>> {
        let mut index = build_index(kind, self.dimensions)?;
        index.insert_batch(&self.vectors)?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use tempfile::TempDir;

    fn sample() -> IndexSnapshot {
        IndexSnapshot::new(
            2,
            vec![
                Entry::new("a ride to the airport", EntryKind::Need, 0, 0),
                Entry::new("a car on weekends", EntryKind::Availability, 1, 1),
            ],
            vec![vec![1.0, 0.0], vec![0.8, 0.6]],
        )
        .expect("valid snapshot")
    }

    #[test]
    fn test_new_rejects_count_mismatch() {
        let result = IndexSnapshot::new(
            2,
            vec![Entry::new("books", EntryKind::Need, 0, 0)],
            Vec::new(),
        );
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
    }

    #[test]
    fn test_new_rejects_out_of_order_positions() {
        let result = IndexSnapshot::new(
            2,
            vec![
                Entry::new("books", EntryKind::Need, 0, 1),
                Entry::new("library card", EntryKind::Availability, 0, 0),
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        );
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
    }

    #[test]
    fn test_save_load_restore() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("snapshot.json");

        let snapshot = sample();
        snapshot.save(&path).expect("save");

        let loaded = IndexSnapshot::load(&path, 2).expect("load");
        assert_eq!(loaded, snapshot);

        let index = loaded.restore(IndexKind::Flat).expect("restore");
        assert_eq!(index.len(), 2);
        let hits = index
            .search(&[vec![1.0, 0.0]], 5, 0.3)
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].result_position, 0);
    }

    #[test]
    fn test_load_dimension_mismatch() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        sample().save(&path).expect("save");

        assert!(matches!(
            IndexSnapshot::load(&path, 384),
            Err(Error::DimensionMismatch {
                expected: 384,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_load_tampered_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        let tampered = serde_json::json!({
            "dimensions": 2,
            "entries": [
                { "text": "books", "kind": "need", "source_note_id": 0, "position": 0 }
            ],
            "vectors": [[1.0, 0.0], [0.0, 1.0]]
        });
        fs::write(&path, tampered.to_string()).expect("write");

        assert!(matches!(
            IndexSnapshot::load(&path, 2),
            Err(Error::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            IndexSnapshot::load(&dir.path().join("absent.json"), 2),
            Err(Error::OperationFailed { .. })
        ));
    }
}
