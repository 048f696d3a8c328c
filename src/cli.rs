//! CLI parsing and orchestration. Parses args, merges config, runs one catalog command, and
//! maps errors to exit codes.

use crate::aggregate::aggregate_with_outcome;
use crate::config::{self, Config};
use crate::favorites::{FavoritesStore, JsonFileBackend, StoreError};
use crate::feed::{FeedOptions, StopReason, DEFAULT_LANGUAGE, MAX_RECORDS, PAGE_SIZE};
use crate::formats::{
    write_chapters, write_favorites, write_manga_list, write_pages, write_reading, write_tags,
    write_to_path, FormatError, OutputFormat,
};
use crate::model::FavoriteManga;
use crate::reader::{ChapterNeighbors, PageCursor, ReadingView};
use crate::upstream::catalog::{self, SearchQuery, DEFAULT_SEARCH_LIMIT};
use crate::upstream::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::upstream::{validate_id, ApiClient, RetryPolicy, UpstreamError, DEFAULT_BASE_URL};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("Could not fetch chapters for {manga_id}: {reason}")]
    FeedFailed { manga_id: String, reason: String },

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Upstream(_) | CliRunError::FeedFailed { .. } => 2,
            CliRunError::Store(_) | CliRunError::Format(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mangafeed")]
#[command(about = "Browse a manga catalog and list each series' chapters, one per chapter number")]
#[command(
    after_help = "Config file keys (base_url, user_agent, language, timeout_secs, retry_count, retry_base_delay_secs, max_chapters, favorites_path, format) are read from ./mangafeed.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format: json, text, or markdown (overrides config; default text).
    #[arg(long, global = true, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log progress and print the full error chain.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 8).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// API root (overrides config; default https://api.mangadex.org).
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ordered chapter list for a manga, one entry per chapter number.
    Chapters {
        manga_id: String,

        /// Translated language code (overrides config; default en).
        #[arg(long)]
        lang: Option<String>,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search the catalog by title and genre tags.
    Search {
        query: Option<String>,

        /// Tag id to require; repeatable.
        #[arg(long = "genre")]
        genres: Vec<String>,

        /// Maximum results (default 12).
        #[arg(long)]
        limit: Option<u32>,
    },

    /// List genre and theme tags.
    Tags,

    /// Resolve the curated featured series.
    Featured,

    /// Page image URLs for a chapter.
    Pages { chapter_id: String },

    /// Show a chapter, its neighbours, and one page.
    Read {
        chapter_id: String,

        /// 1-based page number; clamped to the last page.
        #[arg(long, default_value = "1", value_parser = parse_page)]
        page: usize,
    },

    /// Manage the local favorites list.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
    List,
    Add {
        id: String,

        #[arg(long)]
        title: String,

        /// Cover image URL.
        #[arg(long, default_value = "")]
        cover: String,

        #[arg(long, default_value = "")]
        description: String,
    },
    Remove {
        id: String,
    },
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "text" | "txt" => Ok(OutputFormat::Text),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use json, text, or markdown.",
            s
        )),
    }
}

fn parse_page(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!(
            "Invalid --page value: '{}'. Pages are numbered from 1.",
            s
        )),
    }
}

/// Effective settings after merging flags, config, and defaults.
#[derive(Debug)]
struct Settings {
    base_url: String,
    user_agent: Option<String>,
    language: String,
    timeout_secs: u64,
    retry: RetryPolicy,
    max_chapters: usize,
    favorites_path: Option<PathBuf>,
    format: OutputFormat,
}

fn resolve_settings(args: &Args, config: Option<&Config>) -> Result<Settings, CliRunError> {
    let config_format = match config.and_then(|c| c.format.as_deref()) {
        Some(s) => Some(parse_format(s).map_err(|e| {
            CliRunError::InvalidInput(format!("Invalid config key 'format': {}", e))
        })?),
        None => None,
    };
    let language = match &args.command {
        Command::Chapters { lang: Some(l), .. } => l.clone(),
        _ => config
            .and_then(|c| c.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    };
    if language.trim().is_empty() {
        return Err(CliRunError::InvalidInput(
            "Language code must not be empty.".to_string(),
        ));
    }
    let retry_count = config
        .and_then(|c| c.retry_count)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
        .max(1);
    let base_delay = config
        .and_then(|c| c.retry_base_delay_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_BASE_DELAY);
    Ok(Settings {
        base_url: args
            .base_url
            .clone()
            .or_else(|| config.and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        language: language.trim().to_string(),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        retry: RetryPolicy::new(retry_count, base_delay),
        max_chapters: config
            .and_then(|c| c.max_chapters)
            .unwrap_or(MAX_RECORDS),
        favorites_path: config.and_then(|c| c.favorites_path.clone()),
        format: args.format.or(config_format).unwrap_or_default(),
    })
}

fn build_client(settings: &Settings) -> Result<ApiClient, CliRunError> {
    let mut builder = ApiClient::builder()
        .base_url(settings.base_url.clone())
        .timeout_secs(settings.timeout_secs)
        .retry_policy(settings.retry);
    if let Some(ref ua) = settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

/// Reject ids that cannot be used in an upstream path before any request is made.
fn require_id(id: &str, what: &str) -> Result<(), CliRunError> {
    validate_id(id).map_err(|e| match e {
        UpstreamError::InvalidId { input, reason } => {
            CliRunError::InvalidInput(format!("Invalid {} id '{}': {}", what, input, reason))
        }
        other => CliRunError::Upstream(other),
    })
}

/// Ensure the output file's parent directory exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Run `write` against `output` if given, otherwise stdout.
fn emit<F>(output: Option<&Path>, quiet: bool, write: F) -> Result<(), CliRunError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), FormatError>,
{
    match output {
        Some(path) => {
            validate_output_path(path)?;
            write_to_path(path, |f| write(f))?;
            if !quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)?;
            lock.flush().map_err(FormatError::from)?;
        }
    }
    Ok(())
}

fn feed_spinner() -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar.set_message("Fetching chapter feed");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn feed_options(settings: &Settings) -> FeedOptions {
    FeedOptions {
        language: settings.language.clone(),
        page_size: PAGE_SIZE,
        max_records: settings.max_chapters,
        retry: settings.retry,
    }
}

fn run_chapters(
    args: &Args,
    settings: &Settings,
    manga_id: &str,
    output: Option<&Path>,
) -> Result<(), CliRunError> {
    require_id(manga_id, "manga")?;
    let client = build_client(settings)?;
    let options = feed_options(settings);

    let spinner = if args.quiet { None } else { Some(feed_spinner()) };
    let report = |fetched: usize, total: Option<u64>| {
        if let Some(ref pb) = spinner {
            match total {
                Some(t) => pb.set_message(format!("Fetched {}/{} feed records", fetched, t)),
                None => pb.set_message(format!("Fetched {} feed records", fetched)),
            }
        }
    };
    let progress: Option<&dyn Fn(usize, Option<u64>)> = if spinner.is_some() {
        Some(&report)
    } else {
        None
    };
    let result = aggregate_with_outcome(&client, client.sleeper(), manga_id, &options, progress);
    if let Some(ref pb) = spinner {
        pb.finish_and_clear();
    }

    if let StopReason::Aborted(ref reason) = result.feed.stop {
        if result.failed_outright() {
            return Err(CliRunError::FeedFailed {
                manga_id: manga_id.to_string(),
                reason: reason.clone(),
            });
        }
        tracing::warn!(
            manga_id,
            fetched = result.feed.records.len(),
            reason = %reason,
            "chapter feed incomplete; listing what was fetched"
        );
    }
    tracing::info!(
        manga_id,
        chapters = result.chapters.len(),
        pages = result.feed.pages,
        "aggregated chapters"
    );
    emit(output, args.quiet, |out| {
        write_chapters(out, &result.chapters, settings.format)
    })
}

fn run_read(
    args: &Args,
    settings: &Settings,
    chapter_id: &str,
    page: usize,
) -> Result<(), CliRunError> {
    require_id(chapter_id, "chapter")?;
    let client = build_client(settings)?;
    let info = catalog::chapter_info(&client, chapter_id)?;
    let chapters = match info.manga_id {
        Some(ref manga_id) => {
            let options = feed_options(settings);
            aggregate_with_outcome(&client, client.sleeper(), manga_id, &options, None).chapters
        }
        None => Vec::new(),
    };
    let pages = catalog::chapter_pages(&client, chapter_id);
    let cursor = PageCursor::at(pages.len(), page.saturating_sub(1));
    let view = ReadingView::new(
        info,
        ChapterNeighbors::locate(&chapters, chapter_id),
        &pages,
        cursor,
    );
    emit(None, args.quiet, |out| write_reading(out, &view, settings.format))
}

fn open_favorites(settings: &Settings) -> Result<FavoritesStore<JsonFileBackend>, CliRunError> {
    let path = settings
        .favorites_path
        .clone()
        .or_else(JsonFileBackend::default_path)
        .ok_or_else(|| {
            CliRunError::InvalidInput(
                "Cannot determine a data directory for favorites. Set favorites_path in the config file."
                    .to_string(),
            )
        })?;
    Ok(FavoritesStore::open(JsonFileBackend::new(path))?)
}

fn run_favorites(
    args: &Args,
    settings: &Settings,
    action: &FavoritesCommand,
) -> Result<(), CliRunError> {
    match action {
        FavoritesCommand::List => {
            let store = open_favorites(settings)?;
            emit(None, args.quiet, |out| {
                write_favorites(out, store.list(), settings.format)
            })
        }
        FavoritesCommand::Add {
            id,
            title,
            cover,
            description,
        } => {
            require_id(id, "manga")?;
            if title.trim().is_empty() {
                return Err(CliRunError::InvalidInput(
                    "Favorite title must not be empty.".to_string(),
                ));
            }
            let mut store = open_favorites(settings)?;
            let added = store.add(FavoriteManga {
                id: id.clone(),
                title: title.trim().to_string(),
                cover_image: cover.clone(),
                description: description.clone(),
            })?;
            if !args.quiet {
                if added {
                    eprintln!("Added {} to favorites", id);
                } else {
                    eprintln!("{} is already a favorite", id);
                }
            }
            Ok(())
        }
        FavoritesCommand::Remove { id } => {
            let mut store = open_favorites(settings)?;
            let removed = store.remove(id)?;
            if !args.quiet {
                if removed {
                    eprintln!("Removed {} from favorites", id);
                } else {
                    eprintln!("{} was not a favorite", id);
                }
            }
            Ok(())
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(|e| CliRunError::InvalidInput(format!("{:#}", e)))?;
    let settings = resolve_settings(args, config.as_ref())?;
    tracing::debug!(?settings, "effective settings");

    match &args.command {
        Command::Chapters {
            manga_id, output, ..
        } => run_chapters(args, &settings, manga_id, output.as_deref()),
        Command::Search {
            query,
            genres,
            limit,
        } => {
            let client = build_client(&settings)?;
            let query = SearchQuery {
                title: query.clone().filter(|q| !q.trim().is_empty()),
                genres: genres.clone(),
                limit: limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                language: settings.language.clone(),
            };
            let results = catalog::search_manga(&client, &query)?;
            emit(None, args.quiet, |out| {
                write_manga_list(out, &results, settings.format)
            })
        }
        Command::Tags => {
            let client = build_client(&settings)?;
            let tags = catalog::list_tags(&client)?;
            emit(None, args.quiet, |out| write_tags(out, &tags, settings.format))
        }
        Command::Featured => {
            let client = build_client(&settings)?;
            let series = catalog::featured(&client, &settings.language);
            emit(None, args.quiet, |out| {
                write_manga_list(out, &series, settings.format)
            })
        }
        Command::Pages { chapter_id } => {
            require_id(chapter_id, "chapter")?;
            let client = build_client(&settings)?;
            let pages = catalog::chapter_pages(&client, chapter_id);
            emit(None, args.quiet, |out| write_pages(out, &pages, settings.format))
        }
        Command::Read { chapter_id, page } => run_read(args, &settings, chapter_id, *page),
        Command::Favorites { action } => run_favorites(args, &settings, action),
    }
}
