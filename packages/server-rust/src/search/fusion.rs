//! Reciprocal-rank fusion over multiple ranked search result lists, plus
//! opaque pagination cursors scoped to the query that minted them.

use std::collections::HashMap;

use topgun_core::hash::fnv1a_hash;
use topgun_core::messages::query::CursorStatus;
use topgun_core::messages::search::SearchResultEntry;

/// Standard reciprocal-rank-fusion constant, matching the Cormack/Clarke/
/// Buettcher default that most fusion implementations use unless tuned.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Fuses multiple ranked lists into one: each entry's score becomes the sum
/// of `1 / (k + rank)` across every list it appears in (rank is 1-based),
/// then the merged set is sorted by that score descending, ties broken by
/// key for a deterministic order. A result ranked highly in several lists
/// outranks one ranked first in only a single list.
#[must_use]
pub fn reciprocal_rank_fusion(lists: &[Vec<SearchResultEntry>], k: f64) -> Vec<SearchResultEntry> {
    let mut fused: HashMap<&str, (SearchResultEntry, f64)> = HashMap::new();
    for list in lists {
        for (rank, entry) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (rank + 1) as f64);
            fused
                .entry(entry.key.as_str())
                .and_modify(|(_, total)| *total += contribution)
                .or_insert_with(|| (entry.clone(), contribution));
        }
    }

    let mut results: Vec<SearchResultEntry> = fused
        .into_values()
        .map(|(mut entry, total)| {
            entry.score = total;
            entry
        })
        .collect();
    results.sort_by(|a, b| {
        b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.key.cmp(&b.key))
    });
    results
}

/// An opaque cursor over a fused result list: the offset of the next
/// result to return, plus a fingerprint of the query string that minted it
/// so a cursor can't be replayed against a different search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCursor {
    pub offset: u32,
    query_fingerprint: u32,
}

impl SearchCursor {
    #[must_use]
    pub fn new(offset: u32, query: &str) -> Self {
        Self { offset, query_fingerprint: fnv1a_hash(query) }
    }

    /// Encodes the cursor as the opaque wire string clients pass back in
    /// `Query::cursor`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{:x}.{:x}", self.offset, self.query_fingerprint)
    }

    /// Decodes a cursor string against the query it's being used with.
    /// Malformed input is `Invalid`; a well-formed cursor whose fingerprint
    /// doesn't match `query` is treated as `Expired` (the underlying search
    /// changed out from under it), matching the wire `CursorStatus` enum.
    #[must_use]
    pub fn decode(cursor: &str, query: &str) -> (Option<Self>, CursorStatus) {
        let Some((offset_hex, fingerprint_hex)) = cursor.split_once('.') else {
            return (None, CursorStatus::Invalid);
        };
        let (Ok(offset), Ok(query_fingerprint)) =
            (u32::from_str_radix(offset_hex, 16), u32::from_str_radix(fingerprint_hex, 16))
        else {
            return (None, CursorStatus::Invalid);
        };
        if query_fingerprint != fnv1a_hash(query) {
            return (None, CursorStatus::Expired);
        }
        (Some(Self { offset, query_fingerprint }), CursorStatus::Valid)
    }
}
