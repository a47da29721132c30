//! Matching pipeline integration tests.
//!
//! Exercises the pipeline end to end with fake collaborators:
//! - Self-matches never surface
//! - Only need → availability pairs are kept
//! - Entry positions are stable and contiguous
//! - One malformed extraction does not affect the others
//! - One failed suggestion does not affect the others
//! - The similarity threshold is strict
//! - Rebuilding the index from the same vectors gives the same results

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hiddenthread::config::MatchingConfig;
use hiddenthread::services::FALLBACK_PREFIX;
use hiddenthread::storage::build_index;
use hiddenthread::{
    Embedder, Entry, EntryBuilder, EntryKind, Error, IndexKind, IndexSnapshot, MatchingPipeline,
    NoteExtraction, Result, SuggestionGenerator,
};
use serde_json::json;
use tempfile::TempDir;
use test_case::test_case;

// ============================================================================
// Fakes
// ============================================================================

/// Embedder backed by a fixed text → vector table.
struct TableEmbedder {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableEmbedder {
    fn new(dimensions: usize, rows: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dimensions,
            table: rows
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for TableEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no vector for {text:?}")))
    }
}

fn echo(need: &str, availability: &str) -> Result<String> {
    Ok(format!("connect '{need}' with '{availability}'"))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn pipeline_with(
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn SuggestionGenerator>,
    config: MatchingConfig,
) -> MatchingPipeline {
    MatchingPipeline::new(embedder, generator, config).expect("pipeline")
}

/// Four near-identical phrases: two needs, two availabilities.
fn near_identical_embedder() -> Arc<TableEmbedder> {
    Arc::new(TableEmbedder::new(
        3,
        &[
            ("need a", vec![1.0, 0.0, 0.0]),
            ("need b", vec![0.999, 0.045, 0.0]),
            ("have a", vec![0.998, 0.0, 0.063]),
            ("have b", vec![0.997, 0.077, 0.0]),
        ],
    ))
}

// ============================================================================
// Matching Properties
// ============================================================================

mod matching {
    use super::*;

    #[test]
    fn test_no_self_match() {
        let embedder = near_identical_embedder();
        let pipeline = pipeline_with(
            embedder,
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let entries = EntryBuilder::build(&[
            NoteExtraction::new(0, strings(&["need a", "need b"]), Vec::new()),
            NoteExtraction::new(1, Vec::new(), strings(&["have a", "have b"])),
        ]);

        let matches = pipeline.find_matches(&entries).expect("matches");
        assert!(matches.iter().all(|m| m.query_position != m.result_position));
    }

    #[test]
    fn test_directional_filter_yields_four_pairs() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let entries = EntryBuilder::build(&[
            NoteExtraction::new(0, strings(&["need a", "need b"]), Vec::new()),
            NoteExtraction::new(1, Vec::new(), strings(&["have a", "have b"])),
        ]);

        let matches = pipeline.find_matches(&entries).expect("matches");
        let mut pairs: Vec<_> = matches.iter().map(|m| m.pair()).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 2), (0, 3), (1, 2), (1, 3)]);

        for m in &matches {
            assert_eq!(entries[m.query_position].kind(), EntryKind::Need);
            assert_eq!(entries[m.result_position].kind(), EntryKind::Availability);
        }
    }

    #[test]
    fn test_matches_grouped_by_query_with_descending_scores() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let entries = EntryBuilder::build(&[
            NoteExtraction::new(0, strings(&["need a", "need b"]), Vec::new()),
            NoteExtraction::new(1, Vec::new(), strings(&["have a", "have b"])),
        ]);

        let matches = pipeline.find_matches(&entries).expect("matches");
        for window in matches.windows(2) {
            assert!(window[0].query_position <= window[1].query_position);
            if window[0].query_position == window[1].query_position {
                assert!(window[0].score >= window[1].score);
            }
        }
    }

    #[test]
    fn test_only_needs_is_empty_not_error() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let suggestions = pipeline
            .run(&[NoteExtraction::new(0, strings(&["need a", "need b"]), Vec::new())])
            .expect("run");
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_zero_entries_skips_embedding() {
        let embedder = near_identical_embedder();
        let pipeline = pipeline_with(
            embedder.clone(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );

        assert!(pipeline.run(&[]).expect("run").is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_embedding_failure_fails_batch() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let result = pipeline.run(&[NoteExtraction::new(0, strings(&["unknown"]), Vec::new())]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_top_k_limits_matches_per_query() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3).with_top_k(2),
        );
        let entries = EntryBuilder::build(&[
            NoteExtraction::new(0, strings(&["need a"]), Vec::new()),
            NoteExtraction::new(1, Vec::new(), strings(&["have a", "have b"])),
        ]);

        // Top two hits for "need a" are itself and the closest availability.
        let matches = pipeline.find_matches(&entries).expect("matches");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pair(), (0, 1));
    }
}

// ============================================================================
// Threshold Boundary
// ============================================================================

#[test_case(0.3, false ; "exactly at threshold is excluded")]
#[test_case(0.300_01, true ; "just above threshold is included")]
#[test_case(0.299_99, false ; "just below threshold is excluded")]
fn test_threshold_is_strict(score: f32, expected: bool) {
    let embedder = Arc::new(TableEmbedder::new(
        2,
        &[("need", vec![1.0, 0.0]), ("have", vec![score, 0.5])],
    ));
    let pipeline = pipeline_with(
        embedder,
        Arc::new(echo),
        MatchingConfig::default().with_dimensions(2).with_threshold(0.3),
    );
    let entries = EntryBuilder::build(&[
        NoteExtraction::new(0, strings(&["need"]), Vec::new()),
        NoteExtraction::new(1, Vec::new(), strings(&["have"])),
    ]);

    let matches = pipeline.find_matches(&entries).expect("matches");
    assert_eq!(!matches.is_empty(), expected);
}

// ============================================================================
// Failure Isolation
// ============================================================================

mod isolation {
    use super::*;

    #[test]
    fn test_malformed_note_contributes_nothing() {
        let values = [
            json!({ "resources_needed": ["need a"], "resources_available": [] }),
            json!({ "sentiments": "not even a list" }),
            json!({ "resources_needed": [], "resources_available": ["have a"] }),
        ];
        let entries = EntryBuilder::from_values(&values);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source_note_id(), 0);
        assert_eq!(entries[1].source_note_id(), 2);

        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let suggestions = pipeline.run_entries(&entries).expect("run");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].related_notes.need_note_id, 0);
        assert_eq!(suggestions[0].related_notes.availability_note_id, 2);
    }

    #[test]
    fn test_failed_suggestion_does_not_drop_others() {
        let embedder = Arc::new(TableEmbedder::new(
            2,
            &[
                ("first need", vec![1.0, 0.0]),
                ("second need", vec![0.0, 1.0]),
                ("first have", vec![1.0, 0.0]),
                ("second have", vec![0.0, 1.0]),
            ],
        ));
        let generator = |need: &str, availability: &str| -> Result<String> {
            if need == "first need" {
                Err(Error::OperationFailed {
                    operation: "generate_suggestion".to_string(),
                    cause: "upstream timed out".to_string(),
                })
            } else {
                echo(need, availability)
            }
        };
        let pipeline = pipeline_with(
            embedder,
            Arc::new(generator),
            MatchingConfig::default().with_dimensions(2),
        );

        let suggestions = pipeline
            .run(&[
                NoteExtraction::new(0, strings(&["first need", "second need"]), Vec::new()),
                NoteExtraction::new(1, Vec::new(), strings(&["first have", "second have"])),
            ])
            .expect("batch succeeds");

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].id.to_string(), "sugg_1");
        assert!(suggestions[0].fallback);
        assert!(suggestions[0].suggestion.starts_with(FALLBACK_PREFIX));
        assert!(suggestions[0].suggestion.contains("upstream timed out"));

        assert_eq!(suggestions[1].id.to_string(), "sugg_2");
        assert!(!suggestions[1].fallback);
        assert_eq!(
            suggestions[1].suggestion,
            "connect 'second need' with 'second have'"
        );
    }
}

// ============================================================================
// Rebuild and Snapshots
// ============================================================================

mod rebuild {
    use super::*;

    fn vectors() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.6, 0.8, 0.0],
            vec![0.0, 0.6, 0.8],
            vec![0.8, 0.0, 0.6],
        ]
    }

    #[test]
    fn test_fresh_indexes_give_identical_results() {
        let mut first = build_index(IndexKind::Flat, 3).expect("index");
        let mut second = build_index(IndexKind::Flat, 3).expect("index");
        first.insert_batch(&vectors()).expect("insert");
        second.insert_batch(&vectors()).expect("insert");

        let a = first.search(&vectors(), 3, 0.1).expect("search");
        let b = second.search(&vectors(), 3, 0.1).expect("search");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_pipeline_runs_are_repeatable() {
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let extractions = [
            NoteExtraction::new(0, strings(&["need a", "need b"]), strings(&["have a"])),
            NoteExtraction::new(1, Vec::new(), strings(&["have b"])),
        ];

        assert_eq!(
            pipeline.run(&extractions).expect("first"),
            pipeline.run(&extractions).expect("second")
        );
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshots").join("index.json");
        let pipeline = pipeline_with(
            near_identical_embedder(),
            Arc::new(echo),
            MatchingConfig::default().with_dimensions(3),
        );
        let entries = EntryBuilder::build(&[
            NoteExtraction::new(0, strings(&["need a"]), Vec::new()),
            NoteExtraction::new(1, Vec::new(), strings(&["have a"])),
        ]);

        let expected = pipeline.run_entries(&entries).expect("run");
        pipeline.snapshot(entries).expect("snapshot").save(&path).expect("save");

        let loaded = IndexSnapshot::load(&path, 3).expect("load");
        assert_eq!(pipeline.run_snapshot(&loaded).expect("run"), expected);

        assert!(matches!(
            IndexSnapshot::load(&path, 384),
            Err(Error::DimensionMismatch {
                expected: 384,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_snapshot_rejects_desynchronized_data() {
        let entries = vec![
            Entry::new("need a", EntryKind::Need, 0, 0),
            Entry::new("have a", EntryKind::Availability, 1, 1),
        ];
        let result = IndexSnapshot::new(3, entries, vec![vec![1.0, 0.0, 0.0]]);
        assert!(matches!(result, Err(Error::IntegrityViolation(_))));
    }
}
