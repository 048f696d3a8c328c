//! Paginated feed fetcher: pulls every chapter record for one manga from the upstream
//! feed, page by page, with retries and a hard record ceiling.

use crate::model::RawChapterRecord;
use crate::upstream::{validate_id, RetryPolicy, Sleeper, UpstreamError};

/// Records requested per page.
pub const PAGE_SIZE: u32 = 100;
/// Safety bound on records considered per manga (50 pages).
pub const MAX_RECORDS: usize = 5000;
pub const DEFAULT_LANGUAGE: &str = "en";

/// One page request: `limit` records starting at `offset`, filtered to `language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery<'a> {
    pub limit: u32,
    pub offset: u64,
    pub language: &'a str,
}

/// One page of feed results and the upstream's total across all pages, if reported.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub records: Vec<RawChapterRecord>,
    pub total: Option<u64>,
}

/// Source of feed pages. Implemented by the HTTP client and by scripted sources in tests.
///
/// Implementations make a single attempt; retrying is the fetcher's job.
pub trait FeedSource {
    fn fetch_page(&self, manga_id: &str, query: &FeedQuery<'_>) -> Result<FeedPage, UpstreamError>;
}

/// Fetcher settings.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub language: String,
    pub page_size: u32,
    pub max_records: usize,
    pub retry: RetryPolicy,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            page_size: PAGE_SIZE,
            max_records: MAX_RECORDS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why the page loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Accumulated the upstream-reported total.
    Complete,
    /// A page came back shorter than requested.
    ShortPage,
    /// Hit the record ceiling.
    Ceiling,
    /// A page failed permanently or exhausted its retries.
    Aborted(String),
}

/// Result of a fetch: whatever was accumulated, plus how the loop ended.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub records: Vec<RawChapterRecord>,
    /// Pages successfully fetched.
    pub pages: u32,
    pub stop: StopReason,
}

impl FeedOutcome {
    /// True when the fetch aborted before retrieving anything. Callers report this as a
    /// failure rather than as "no chapters".
    pub fn failed_outright(&self) -> bool {
        matches!(self.stop, StopReason::Aborted(_)) && self.records.is_empty()
    }
}

/// Walks the feed for one manga at a time. Holds no state between fetches.
pub struct FeedFetcher<'a> {
    source: &'a dyn FeedSource,
    sleeper: &'a dyn Sleeper,
    options: FeedOptions,
    progress: Option<&'a dyn Fn(usize, Option<u64>)>,
}

impl<'a> FeedFetcher<'a> {
    pub fn new(source: &'a dyn FeedSource, sleeper: &'a dyn Sleeper, options: FeedOptions) -> Self {
        Self {
            source,
            sleeper,
            options,
            progress: None,
        }
    }

    /// Called after each page with (records so far, upstream total).
    pub fn with_progress(mut self, progress: &'a dyn Fn(usize, Option<u64>)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// All chapter records for `manga_id`. Empty when nothing could be retrieved.
    pub fn fetch_all_chapters(&self, manga_id: &str) -> Vec<RawChapterRecord> {
        self.fetch(manga_id).records
    }

    /// Fetch pages until the total is reached, a short page arrives, or the ceiling is
    /// hit. Failures end the loop and keep what was accumulated.
    pub fn fetch(&self, manga_id: &str) -> FeedOutcome {
        let mut records: Vec<RawChapterRecord> = Vec::new();
        let mut pages = 0u32;

        if let Err(e) = validate_id(manga_id) {
            tracing::warn!(error = %e, "refusing to fetch feed");
            return FeedOutcome {
                records,
                pages,
                stop: StopReason::Aborted(e.to_string()),
            };
        }

        let page_size = self.options.page_size.max(1);
        let max_records = self.options.max_records;
        let mut offset = 0u64;

        let stop = loop {
            if records.len() >= max_records {
                break StopReason::Ceiling;
            }
            let remaining = max_records - records.len();
            let limit = page_size.min(u32::try_from(remaining).unwrap_or(u32::MAX));
            let query = FeedQuery {
                limit,
                offset,
                language: &self.options.language,
            };

            let result = self.options.retry.run(self.sleeper, |attempt| {
                tracing::debug!(manga_id, offset, limit, attempt, "requesting feed page");
                self.source.fetch_page(manga_id, &query)
            });
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        manga_id,
                        offset,
                        accumulated = records.len(),
                        error = %e,
                        "feed page failed; keeping partial results"
                    );
                    break StopReason::Aborted(e.to_string());
                }
            };

            pages += 1;
            let received = page.records.len();
            records.extend(page.records);
            offset += received as u64;
            if let Some(progress) = self.progress {
                progress(records.len(), page.total);
            }

            if page.total.is_some_and(|total| records.len() as u64 >= total) {
                break StopReason::Complete;
            }
            if received < limit as usize {
                break StopReason::ShortPage;
            }
        };

        records.truncate(max_records);
        tracing::info!(
            manga_id,
            records = records.len(),
            pages,
            stop = ?stop,
            "feed fetch finished"
        );
        FeedOutcome {
            records,
            pages,
            stop,
        }
    }
}
