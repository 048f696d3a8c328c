//! mangafeed: manga catalog client that pages a series' chapter feed and reduces it to one
//! canonical entry per chapter number.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod favorites;
pub mod feed;
pub mod formats;
pub mod model;
pub mod reader;
pub mod reduce;
pub mod upstream;

// Re-exports for CLI and consumers.
pub use aggregate::{aggregate, aggregate_with_outcome, Aggregation};
pub use favorites::{FavoritesStore, JsonFileBackend, KeyValueBackend, MemoryBackend, StoreError};
pub use feed::{FeedFetcher, FeedOptions, FeedOutcome, FeedSource, StopReason};
pub use formats::{FormatError, OutputFormat};
pub use model::{CanonicalChapter, RawChapterRecord};
pub use reduce::reduce;
pub use upstream::{ApiClient, ApiClientBuilder, RetryPolicy, Sleeper, UpstreamError};
