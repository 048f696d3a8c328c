//! Aggregation entrypoint: fetch a manga's whole feed, then reduce it to the canonical
//! chapter list.

use crate::feed::{FeedFetcher, FeedOptions, FeedOutcome, FeedSource};
use crate::model::CanonicalChapter;
use crate::reduce::reduce;
use crate::upstream::Sleeper;

/// Canonical chapters plus the fetch outcome they came from.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub chapters: Vec<CanonicalChapter>,
    pub feed: FeedOutcome,
}

impl Aggregation {
    /// Fetch aborted before any record arrived. Distinct from a manga with no chapters.
    pub fn failed_outright(&self) -> bool {
        self.feed.failed_outright()
    }
}

/// Fetch and reduce, keeping the fetch outcome for callers that report failures.
pub fn aggregate_with_outcome(
    source: &dyn FeedSource,
    sleeper: &dyn Sleeper,
    manga_id: &str,
    options: &FeedOptions,
    progress: Option<&dyn Fn(usize, Option<u64>)>,
) -> Aggregation {
    let mut fetcher = FeedFetcher::new(source, sleeper, options.clone());
    if let Some(p) = progress {
        fetcher = fetcher.with_progress(p);
    }
    let feed = fetcher.fetch(manga_id);
    let chapters = reduce(&feed.records, &options.language);
    tracing::debug!(
        manga_id,
        raw = feed.records.len(),
        canonical = chapters.len(),
        "reduced feed"
    );
    Aggregation { chapters, feed }
}

/// Ordered, deduplicated chapters for `manga_id`. Never fails; an empty list means no
/// chapters could be retrieved.
pub fn aggregate(
    source: &dyn FeedSource,
    sleeper: &dyn Sleeper,
    manga_id: &str,
    options: &FeedOptions,
) -> Vec<CanonicalChapter> {
    aggregate_with_outcome(source, sleeper, manga_id, options, None).chapters
}
