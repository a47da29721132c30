//! Match filtering.

use crate::models::{Entry, Match};
use crate::storage::RawMatch;
use crate::{Error, Result};
use std::collections::HashSet;

/// Turns raw index hits into need → availability matches.
///
/// A raw hit survives only if it is not a self-match and its query entry is
/// a need while its result entry is an availability. The relation is
/// directional: availability → need hits are dropped even though similarity
/// is symmetric. Surviving hits keep the order the index produced them in.
#[derive(Debug, Clone, Copy)]
pub struct MatchFilter<'a> {
    entries: &'a [Entry],
    dedup: bool,
}

impl<'a> MatchFilter<'a> {
    /// Creates a filter over the batch's entries.
    #[must_use]
    pub const fn new(entries: &'a [Entry]) -> Self {
        Self {
            entries,
            dedup: false,
        }
    }

    /// Drops repeated `(query, result)` pairs, keeping the first.
    #[must_use]
    pub const fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Filters raw hits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IntegrityViolation`] if a hit refers to a position
    /// outside the entry list.
    pub fn apply(&self, raw: &[RawMatch]) -> Result<Vec<Match>> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for hit in raw {
            if hit.query_position == hit.result_position {
                continue;
            }

            let query = self.entry(hit.query_position)?;
            let result = self.entry(hit.result_position)?;
            if !(query.is_need() && result.is_availability()) {
                continue;
            }

            if self.dedup && !seen.insert((hit.query_position, hit.result_position)) {
                continue;
            }

            matches.push(Match::new(
                hit.query_position,
                hit.result_position,
                hit.score,
            ));
        }

        tracing::debug!(raw = raw.len(), kept = matches.len(), "Filtered matches");
        Ok(matches)
    }

    fn entry(&self, position: usize) -> Result<&'a Entry> {
        self.entries.get(position).ok_or_else(|| {
            Error::IntegrityViolation(format!(
                "match refers to position {position} but only {} entries exist",
                self.entries.len()
            ))
        })
    }
}
