//! Matching pipeline.
//!
//! Sequences entry building, embedding, index search, match filtering and
//! suggestion generation for one batch. A fresh index is built per batch and
//! dropped when the batch completes.

use crate::config::MatchingConfig;
use crate::embedding::Embedder;
use crate::models::{Entry, Match, NoteExtraction, RelatedNotes, Suggestion, SuggestionId};
use crate::services::suggestion::fallback_text;
use crate::services::{EntryBuilder, MatchFilter, SuggestionGenerator};
use crate::storage::{IndexSnapshot, VectorIndex, build_index};
use crate::{Error, Result};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Need → availability matching over one batch of entries.
///
/// The embedder and suggestion generator are injected; the pipeline owns
/// neither the entry list it is given nor any long-lived index.
pub struct MatchingPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn SuggestionGenerator>,
    config: MatchingConfig,
}

impl MatchingPipeline {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `config` is invalid, or
    /// [`Error::DimensionMismatch`] if the embedder's width differs from
    /// `config.dimensions`.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn SuggestionGenerator>,
        config: MatchingConfig,
    ) -> Result<Self> {
        config.validate()?;

        if embedder.dimensions() != config.dimensions {
            return Err(Error::DimensionMismatch {
                expected: config.dimensions,
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            generator,
            config,
        })
    }

    /// Returns the matching configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Runs the full pipeline over a batch of extractions.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the index and entry list
    /// disagree. Suggestion failures never fail the batch.
    pub fn run(&self, extractions: &[NoteExtraction]) -> Result<Vec<Suggestion>> {
        self.run_entries(&EntryBuilder::build(extractions))
    }

    /// Runs matching and suggestion generation over a built entry list.
    ///
    /// # Errors
    ///
    /// See [`MatchingPipeline::run`].
    pub fn run_entries(&self, entries: &[Entry]) -> Result<Vec<Suggestion>> {
        let span = tracing::info_span!("pipeline.run", entries = entries.len());
        let _guard = span.enter();
        let start = Instant::now();

        let matches = self.find_matches(entries)?;
        let suggestions = self.suggest(entries, &matches)?;

        tracing::info!(
            matches = matches.len(),
            suggestions = suggestions.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Pipeline complete"
        );
        Ok(suggestions)
    }

    /// Runs matching and suggestion generation over a restored snapshot.
    ///
    /// The stored vectors are reused; nothing is re-embedded.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is inconsistent or its width differs
    /// from the configured dimensions.
    pub fn run_snapshot(&self, snapshot: &IndexSnapshot) -> Result<Vec<Suggestion>> {
        if snapshot.dimensions() != self.config.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimensions,
                actual: snapshot.dimensions(),
            });
        }

        let entries = snapshot.entries();
        let matches = if entries.is_empty() {
            Vec::new()
        } else {
            let index = snapshot.restore(self.config.index)?;
            self.search_and_filter(index.as_ref(), entries, snapshot.vectors())?
        };
        self.suggest(entries, &matches)
    }

    /// Embeds entry texts in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder fails, returns the wrong number of
    /// vectors, or returns vectors of the wrong width.
    pub fn embed_entries(&self, entries: &[Entry]) -> Result<Vec<Vec<f32>>> {
        let _span = tracing::debug_span!("pipeline.embed", entries = entries.len()).entered();

        let texts: Vec<&str> = entries.iter().map(Entry::text).collect();
        let vectors = self.embedder.embed_batch(&texts)?;

        if vectors.len() != entries.len() {
            return Err(Error::IntegrityViolation(format!(
                "embedder returned {} vectors for {} entries",
                vectors.len(),
                entries.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dimensions) {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimensions,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }

    /// Finds need → availability matches within one batch.
    ///
    /// Every entry is embedded, inserted into a fresh index, then used as a
    /// query against that same index. Zero entries returns no matches
    /// without embedding or searching.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or search fails, or if the index and
    /// entry list disagree.
    pub fn find_matches(&self, entries: &[Entry]) -> Result<Vec<Match>> {
        if entries.is_empty() {
            tracing::debug!("No entries, skipping search");
            return Ok(Vec::new());
        }

        let vectors = self.embed_entries(entries)?;
        self.match_vectors(entries, &vectors)
    }

    /// Finds matches using precomputed vectors, one per entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegrityViolation`] if `vectors` and `entries`
    /// differ in length or an entry's position is not its index.
    pub fn match_vectors(&self, entries: &[Entry], vectors: &[Vec<f32>]) -> Result<Vec<Match>> {
        check_positions(entries)?;
        if vectors.len() != entries.len() {
            return Err(Error::IntegrityViolation(format!(
                "{} vectors for {} entries",
                vectors.len(),
                entries.len()
            )));
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut index = build_index(self.config.index, self.config.dimensions)?;
        let rows = index.insert_batch(vectors)?;
        if rows != (0..entries.len()) {
            return Err(Error::IntegrityViolation(format!(
                "index assigned rows {rows:?} for {} entries",
                entries.len()
            )));
        }

        self.search_and_filter(index.as_ref(), entries, vectors)
    }

    fn search_and_filter(
        &self,
        index: &dyn VectorIndex,
        entries: &[Entry],
        vectors: &[Vec<f32>],
    ) -> Result<Vec<Match>> {
        if index.len() != entries.len() {
            return Err(Error::IntegrityViolation(format!(
                "index holds {} vectors for {} entries",
                index.len(),
                entries.len()
            )));
        }

        let raw = {
            let _span = tracing::debug_span!("pipeline.search", kind = %self.config.index)
                .entered();
            index.search(vectors, self.config.top_k, self.config.similarity_threshold)?
        };

        MatchFilter::new(entries)
            .with_dedup(self.config.dedup)
            .apply(&raw)
    }

    /// Generates one suggestion per match, in match order.
    ///
    /// Up to `max_concurrent_suggestions` generator calls run at once. A
    /// failed call yields a fallback suggestion; it never fails the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegrityViolation`] if a match refers to a position
    /// outside `entries`. This is checked before any generator call.
    pub fn suggest(&self, entries: &[Entry], matches: &[Match]) -> Result<Vec<Suggestion>> {
        let pairs = matches
            .iter()
            .map(|m| {
                let need = entry_at(entries, m.query_position)?;
                let availability = entry_at(entries, m.result_position)?;
                Ok((need, availability, m.score))
            })
            .collect::<Result<Vec<_>>>()?;

        let _span = tracing::info_span!("pipeline.suggest", matches = pairs.len()).entered();

        let mut texts = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(self.config.max_concurrent_suggestions) {
            texts.extend(self.generate_chunk(chunk));
        }

        let mut id = SuggestionId::FIRST;
        let mut suggestions = Vec::with_capacity(pairs.len());
        for ((need, availability, score), outcome) in pairs.into_iter().zip(texts) {
            let (text, fallback) = match outcome {
                Ok(text) => (text, false),
                Err(e) => {
                    tracing::warn!(
                        suggestion_id = %id,
                        error = %e,
                        "Suggestion generation failed, using fallback"
                    );
                    (fallback_text(&e), true)
                },
            };

            suggestions.push(Suggestion {
                id,
                need: need.text().to_string(),
                availability: availability.text().to_string(),
                suggestion: text,
                score,
                related_notes: RelatedNotes {
                    need_note_id: need.source_note_id(),
                    availability_note_id: availability.source_note_id(),
                },
                fallback,
            });
            id = id.next();
        }

        let fallbacks = suggestions.iter().filter(|s| s.fallback).count();
        metrics::counter!("suggestions_generated_total")
            .increment((suggestions.len() - fallbacks) as u64);
        metrics::counter!("suggestion_fallbacks_total").increment(fallbacks as u64);

        Ok(suggestions)
    }

    /// Generates suggestion texts for one chunk, preserving chunk order.
    ///
    /// Every call runs on its own scoped thread, so a panicking generator
    /// yields an error for that match regardless of chunk size.
    fn generate_chunk(&self, chunk: &[(&Entry, &Entry, f32)]) -> Vec<Result<String>> {
        thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|(need, availability, _)| {
                    let generator = Arc::clone(&self.generator);
                    scope.spawn(move || generator.generate(need.text(), availability.text()))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::OperationFailed {
                            operation: "generate_suggestion".to_string(),
                            cause: "generator panicked".to_string(),
                        })
                    })
                })
                .collect()
        })
    }

    /// Embeds entries and packages them as a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the entry positions are not
    /// contiguous from 0.
    pub fn snapshot(&self, entries: Vec<Entry>) -> Result<IndexSnapshot> {
        let vectors = if entries.is_empty() {
            Vec::new()
        } else {
            self.embed_entries(&entries)?
        };
        IndexSnapshot::new(self.config.dimensions, entries, vectors)
    }
}

fn check_positions(entries: &[Entry]) -> Result<()> {
    match entries.iter().enumerate().find(|(i, e)| e.position() != *i) {
        Some((index, entry)) => Err(Error::IntegrityViolation(format!(
            "entry at index {index} has position {}",
            entry.position()
        ))),
        None => Ok(()),
    }
}

fn entry_at(entries: &[Entry], position: usize) -> Result<&Entry> {
    entries.get(position).ok_or_else(|| {
        Error::IntegrityViolation(format!(
            "match refers to position {position} but only {} entries exist",
            entries.len()
        ))
    })
}
