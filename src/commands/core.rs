//! Core command handlers.
//!
//! Contains the implementations of `process`, `match` and `snapshot`.
//! Results are written to stdout as pretty-printed JSON; diagnostics go to
//! the log.

use std::path::Path;

use hiddenthread::cli::{
    build_embedding_pipeline, build_note_processor, build_pipeline, read_extractions, read_notes,
};
use hiddenthread::config::HiddenThreadConfig;
use hiddenthread::{EntryBuilder, IndexSnapshot};
use serde::Serialize;

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Process command: extraction, matching and suggestions over raw notes.
pub fn cmd_process(
    config: &HiddenThreadConfig,
    notes_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let notes = read_notes(notes_path)?;
    let processor = build_note_processor(config)?;

    let result = processor.process_notes(&notes)?;
    tracing::info!(
        notes = result.processed_notes.len(),
        suggestions = result.suggestions.len(),
        generated = result.generated_count(),
        "Processed notes"
    );
    print_json(&result)
}

/// Match command: matching and suggestions over pre-extracted notes, or
/// over a saved snapshot.
pub fn cmd_match(
    config: &HiddenThreadConfig,
    input: &Path,
    from_snapshot: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(config)?;

    let suggestions = if from_snapshot {
        let snapshot = IndexSnapshot::load(input, config.matching.dimensions)?;
        pipeline.run_snapshot(&snapshot)?
    } else {
        let entries = EntryBuilder::from_values(&read_extractions(input)?);
        pipeline.run_entries(&entries)?
    };

    print_json(&serde_json::json!({ "suggestions": suggestions }))
}

/// Snapshot command: embeds pre-extracted notes and saves the index data.
pub fn cmd_snapshot(
    config: &HiddenThreadConfig,
    input: &Path,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = EntryBuilder::from_values(&read_extractions(input)?);
    let pipeline = build_embedding_pipeline(config)?;

    let snapshot = pipeline.snapshot(entries)?;
    snapshot.save(out)?;

    println!(
        "Saved {} entries ({} dimensions) to {}",
        snapshot.entries().len(),
        snapshot.dimensions(),
        out.display()
    );
    Ok(())
}
