//! Output formats for chapter lists, catalog listings, and favorites: JSON, plain text,
//! and Markdown. Writers take any `io::Write`; [`write_to_path`] wraps them for files.

use crate::model::{CanonicalChapter, FavoriteManga, MangaSummary, Tag};
use crate::reader::ReadingView;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Text,
    Markdown,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Write(#[from] std::io::Error),
}

/// Escape characters that would break a Markdown table cell.
pub(crate) fn markdown_cell(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace(['\n', '\r'], " ")
}

fn write_json<W: Write + ?Sized, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), FormatError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Chapter list. JSON is an array of `{ id, title, chapter, pages }`.
pub fn write_chapters<W: Write + ?Sized>(
    out: &mut W,
    chapters: &[CanonicalChapter],
    format: OutputFormat,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Json => write_json(out, chapters)?,
        OutputFormat::Text => {
            if chapters.is_empty() {
                writeln!(out, "No chapters available.")?;
                return Ok(());
            }
            let width = chapters
                .iter()
                .map(|c| c.chapter_number.chars().count())
                .max()
                .unwrap_or(0);
            for ch in chapters {
                let pages = if ch.page_count > 0 {
                    format!("{} pages", ch.page_count)
                } else {
                    "? pages".to_string()
                };
                writeln!(
                    out,
                    "{:>width$}  {}  ({})  {}",
                    ch.chapter_number,
                    ch.title,
                    pages,
                    ch.id,
                    width = width
                )?;
            }
        }
        OutputFormat::Markdown => {
            if chapters.is_empty() {
                writeln!(out, "_No chapters available._")?;
                return Ok(());
            }
            writeln!(out, "| Chapter | Title | Pages | Id |")?;
            writeln!(out, "|---:|---|---:|---|")?;
            for ch in chapters {
                writeln!(
                    out,
                    "| {} | {} | {} | `{}` |",
                    markdown_cell(&ch.chapter_number),
                    markdown_cell(&ch.title),
                    ch.page_count,
                    ch.id
                )?;
            }
        }
    }
    Ok(())
}

/// Search, featured, or favorites listing.
pub fn write_manga_list<W: Write + ?Sized>(
    out: &mut W,
    manga: &[MangaSummary],
    format: OutputFormat,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Json => write_json(out, manga)?,
        OutputFormat::Text => {
            for m in manga {
                writeln!(out, "{}  {}", m.id, m.title)?;
                if let Some(ref link) = m.manga_plus_url {
                    writeln!(out, "    MANGA Plus: {}", link)?;
                }
            }
        }
        OutputFormat::Markdown => {
            for m in manga {
                writeln!(out, "## {}", m.title)?;
                writeln!(out)?;
                if !m.cover_image.is_empty() {
                    writeln!(out, "![cover]({})", m.cover_image)?;
                    writeln!(out)?;
                }
                if !m.description.is_empty() {
                    writeln!(out, "{}", m.description.trim())?;
                    writeln!(out)?;
                }
                writeln!(out, "Id: `{}`", m.id)?;
                if let Some(ref link) = m.manga_plus_url {
                    writeln!(out, "[Read on MANGA Plus]({})", link)?;
                }
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

pub fn write_tags<W: Write + ?Sized>(out: &mut W, tags: &[Tag], format: OutputFormat) -> Result<(), FormatError> {
    match format {
        OutputFormat::Json => write_json(out, tags)?,
        OutputFormat::Text => {
            for t in tags {
                match t.group {
                    Some(ref g) => writeln!(out, "{}  {} [{}]", t.id, t.name, g)?,
                    None => writeln!(out, "{}  {}", t.id, t.name)?,
                }
            }
        }
        OutputFormat::Markdown => {
            writeln!(out, "| Tag | Group | Id |")?;
            writeln!(out, "|---|---|---|")?;
            for t in tags {
                writeln!(
                    out,
                    "| {} | {} | `{}` |",
                    markdown_cell(&t.name),
                    t.group.as_deref().map(markdown_cell).unwrap_or_default(),
                    t.id
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_favorites<W: Write + ?Sized>(
    out: &mut W,
    favorites: &[FavoriteManga],
    format: OutputFormat,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Json => write_json(out, favorites)?,
        OutputFormat::Text | OutputFormat::Markdown if favorites.is_empty() => {
            writeln!(out, "No favorites yet.")?;
        }
        OutputFormat::Text => {
            for f in favorites {
                writeln!(out, "{}  {}", f.id, f.title)?;
            }
        }
        OutputFormat::Markdown => {
            for f in favorites {
                writeln!(out, "- **{}** (`{}`)", f.title, f.id)?;
            }
        }
    }
    Ok(())
}

/// Page image URLs in reading order.
pub fn write_pages<W: Write + ?Sized>(
    out: &mut W,
    pages: &[String],
    format: OutputFormat,
) -> Result<(), FormatError> {
    match format {
        OutputFormat::Json => write_json(out, pages)?,
        OutputFormat::Text | OutputFormat::Markdown if pages.is_empty() => {
            writeln!(out, "No pages available.")?;
        }
        OutputFormat::Text => {
            for url in pages {
                writeln!(out, "{}", url)?;
            }
        }
        OutputFormat::Markdown => {
            for (i, url) in pages.iter().enumerate() {
                writeln!(out, "{}. ![page {}]({})", i + 1, i + 1, url)?;
            }
        }
    }
    Ok(())
}

fn chapter_label(ch: &CanonicalChapter) -> String {
    format!("Ch. {}: {} ({})", ch.chapter_number, ch.title, ch.id)
}

pub fn write_reading<W: Write + ?Sized>(
    out: &mut W,
    view: &ReadingView,
    format: OutputFormat,
) -> Result<(), FormatError> {
    if format == OutputFormat::Json {
        return write_json(out, view);
    }
    let md = format == OutputFormat::Markdown;
    if md {
        writeln!(out, "# {}", view.chapter.manga_title)?;
    } else {
        writeln!(out, "{}", view.chapter.manga_title)?;
    }
    match view.current {
        Some(ref ch) => writeln!(out, "Chapter: {}", chapter_label(ch))?,
        None => writeln!(out, "Chapter: {}", view.chapter.id)?,
    }
    match view.page_url {
        Some(ref url) if md => writeln!(
            out,
            "![page {}/{}]({})",
            view.page, view.page_count, url
        )?,
        Some(ref url) => writeln!(out, "Page {}/{}: {}", view.page, view.page_count, url)?,
        None => writeln!(out, "No pages available.")?,
    }
    if let Some(ref prev) = view.prev {
        writeln!(out, "Previous: {}", chapter_label(prev))?;
    }
    if let Some(ref next) = view.next {
        writeln!(out, "Next: {}", chapter_label(next))?;
    }
    Ok(())
}

/// Create `path` and run `write` against a buffered handle to it.
pub fn write_to_path<F>(path: &Path, write: F) -> Result<(), FormatError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), FormatError>,
{
    let file = File::create(path).map_err(|e| FormatError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut out = BufWriter::new(file);
    write(&mut out)?;
    out.flush().map_err(|e| FormatError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
